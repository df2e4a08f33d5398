use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::provider::{
    DEFAULT_FLIP_PROBABILITY, DEFAULT_NORMALIZE_MEAN, DEFAULT_NORMALIZE_STD, DEFAULT_SEED,
};
use crate::errors::FaceDataError;

/// Channel layout stored in each sample record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelFormat {
    /// Single color image decoded to 3 RGB channels.
    #[default]
    Rgb,
    /// Single 4-channel image: RGB followed by a depth channel.
    Rgbd,
    /// Two concatenated PNG streams: an RGB image and an extra-channel image.
    Rgbdea,
}

impl ChannelFormat {
    /// Stable lowercase name (`rgb`, `rgbd`, `rgbdea`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelFormat::Rgb => "rgb",
            ChannelFormat::Rgbd => "rgbd",
            ChannelFormat::Rgbdea => "rgbdea",
        }
    }
}

impl fmt::Display for ChannelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelFormat {
    type Err = FaceDataError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rgb" => Ok(ChannelFormat::Rgb),
            "rgbd" => Ok(ChannelFormat::Rgbd),
            "rgbdea" => Ok(ChannelFormat::Rgbdea),
            other => Err(FaceDataError::InvalidConfiguration(format!(
                "unsupported channel format '{other}' (expected rgb, rgbd, or rgbdea)"
            ))),
        }
    }
}

/// Spatial resize applied after decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resize {
    /// Exact `(height, width)` output regardless of the input aspect ratio.
    Exact { height: u32, width: u32 },
    /// Scale so the shorter edge equals `size`; the longer edge keeps the
    /// aspect ratio, truncated to an integer.
    ShortEdge { size: u32 },
}

impl Resize {
    /// Exact `(height, width)` target.
    pub fn new(height: u32, width: u32) -> Self {
        Resize::Exact { height, width }
    }

    /// Exact square target.
    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Aspect-preserving target whose shorter edge is `size`.
    pub fn short_edge(size: u32) -> Self {
        Resize::ShortEdge { size }
    }

    /// Output `(height, width)` for an input of `height` x `width`.
    pub fn target(&self, height: u32, width: u32) -> (u32, u32) {
        match *self {
            Resize::Exact { height, width } => (height, width),
            Resize::ShortEdge { size } => {
                if height == 0 || width == 0 {
                    return (height, width);
                }
                let scale_long = |long: u32, short: u32| {
                    let scaled = u64::from(size) * u64::from(long) / u64::from(short);
                    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
                };
                if width <= height {
                    (scale_long(height, width), size)
                } else {
                    (size, scale_long(width, height))
                }
            }
        }
    }

    /// Reject zero-sized targets.
    pub fn validate(&self) -> Result<(), FaceDataError> {
        let degenerate = match *self {
            Resize::Exact { height, width } => height == 0 || width == 0,
            Resize::ShortEdge { size } => size == 0,
        };
        if degenerate {
            return Err(FaceDataError::InvalidConfiguration(format!(
                "resize target must be non-zero, got {self:?}"
            )));
        }
        Ok(())
    }
}

/// Per-channel `(x - mean) / std` normalization applied to `[0, 1]` pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub mean: f32,
    pub std: f32,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            mean: DEFAULT_NORMALIZE_MEAN,
            std: DEFAULT_NORMALIZE_STD,
        }
    }
}

/// What catalog construction does when the leading header flag is not recognized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownHeaderPolicy {
    /// Treat the candidate key set as empty and log a warning.
    #[default]
    Skip,
    /// Fail with `FaceDataError::UnrecognizedHeader`.
    Reject,
}

/// Top-level dataset configuration shared by catalog-backed providers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// RNG seed used when a provider is not handed an explicit generator.
    pub seed: u64,
    /// Channel layout used to decode sample payloads.
    pub channel: ChannelFormat,
    /// Optional resize applied after decoding.
    pub resize: Option<Resize>,
    /// Probability of a horizontal flip per decoded sample (0 disables it).
    pub flip_probability: f32,
    /// Normalization applied after dtype conversion.
    pub normalize: Normalization,
    /// Behavior for unrecognized leading header flags.
    pub unknown_header: UnknownHeaderPolicy,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            channel: ChannelFormat::default(),
            resize: None,
            flip_probability: DEFAULT_FLIP_PROBABILITY,
            normalize: Normalization::default(),
            unknown_header: UnknownHeaderPolicy::default(),
        }
    }
}

impl DatasetConfig {
    /// Reject settings that would only fail later, at fetch time.
    pub fn validate(&self) -> Result<(), FaceDataError> {
        if let Some(resize) = self.resize {
            resize.validate()?;
        }
        if !(0.0..=1.0).contains(&self.flip_probability) {
            return Err(FaceDataError::InvalidConfiguration(format!(
                "flip probability must be within [0, 1], got {}",
                self.flip_probability
            )));
        }
        if !(self.normalize.std.is_finite() && self.normalize.std > 0.0) {
            return Err(FaceDataError::InvalidConfiguration(format!(
                "normalization std must be positive, got {}",
                self.normalize.std
            )));
        }
        Ok(())
    }
}
