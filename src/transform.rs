use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use ndarray::Array3;
use rand::Rng;

use crate::config::{DatasetConfig, Normalization, Resize};
use crate::data::ImageTensor;
use crate::decode::DecodedImage;
use crate::errors::FaceDataError;

/// Per-sample transform chain: optional flip, `[0, 1]` rescale, optional resize, normalize.
///
/// Resizing happens before normalization; with a linear filter the two
/// orders agree, and the resampler operates on non-negative values.
#[derive(Clone, Debug)]
pub struct SampleTransform {
    pub flip_probability: f32,
    pub resize: Option<Resize>,
    pub normalize: Normalization,
}

impl SampleTransform {
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            flip_probability: config.flip_probability,
            resize: config.resize,
            normalize: config.normalize,
        }
    }

    /// Transform without augmentation: resize and map `[0, 255]` to `[-1, 1]`.
    pub fn evaluation(resize: Option<Resize>) -> Self {
        Self {
            flip_probability: 0.0,
            resize,
            normalize: Normalization::default(),
        }
    }

    /// Apply the chain, drawing the flip decision from `rng`.
    ///
    /// No value is drawn when the flip probability is zero.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        image: &DecodedImage,
        rng: &mut R,
    ) -> Result<ImageTensor, FaceDataError> {
        let flip = self.draw_flip(rng);
        self.apply_with_flip(image, flip)
    }

    /// Draw the flip decision alone.
    pub fn draw_flip<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.flip_probability > 0.0 && rng.random::<f32>() < self.flip_probability
    }

    /// Apply the chain with an explicit flip decision.
    pub fn apply_with_flip(
        &self,
        image: &DecodedImage,
        flip: bool,
    ) -> Result<ImageTensor, FaceDataError> {
        let channels = image.channels;
        let (mut height, mut width) = (image.height, image.width);
        let mut planes = image.to_unit_planes();
        if flip {
            flip_horizontal(&mut planes, width as usize);
        }
        if let Some(resize) = self.resize {
            let (target_height, target_width) = resize.target(height, width);
            if (target_height, target_width) != (height, width) {
                planes = resize_planes(
                    planes,
                    channels,
                    (width, height),
                    (target_width, target_height),
                )?;
                height = target_height;
                width = target_width;
            }
        }
        let Normalization { mean, std } = self.normalize;
        for value in &mut planes {
            *value = (*value - mean) / std;
        }
        let shape = (channels, height as usize, width as usize);
        let got = planes.len();
        Array3::from_shape_vec(shape, planes)
            .map(Array3::into_dyn)
            .map_err(|_| FaceDataError::ShapeMismatch {
                expected: vec![shape.0, shape.1, shape.2],
                got: vec![got],
            })
    }
}

fn flip_horizontal(planes: &mut [f32], width: usize) {
    if width == 0 {
        return;
    }
    for row in planes.chunks_exact_mut(width) {
        row.reverse();
    }
}

fn resize_planes(
    planes: Vec<f32>,
    channels: usize,
    (width, height): (u32, u32),
    (target_width, target_height): (u32, u32),
) -> Result<Vec<f32>, FaceDataError> {
    let plane_len = width as usize * height as usize;
    let mut out = Vec::with_capacity(channels * target_width as usize * target_height as usize);
    for plane in planes.chunks_exact(plane_len.max(1)).take(channels) {
        let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_raw(width, height, plane.to_vec()).ok_or_else(|| {
                FaceDataError::ShapeMismatch {
                    expected: vec![height as usize, width as usize],
                    got: vec![plane.len()],
                }
            })?;
        let resized = imageops::resize(&buffer, target_width, target_height, FilterType::Triangle);
        out.extend(resized.into_raw());
    }
    Ok(out)
}
