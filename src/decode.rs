//! Channel-format decoding of sample payloads.
//!
//! Codec work is delegated to the `image` crate; this module only selects the
//! decode strategy for a [`ChannelFormat`] and arranges channels.

use image::error::{DecodingError, ImageFormatHint};
use image::{DynamicImage, ImageError, ImageFormat};

use crate::config::ChannelFormat;
use crate::constants::image::{PNG_SIGNATURE, RGB_CHANNELS, RGBD_CHANNELS};
use crate::errors::FaceDataError;

/// Decoded 8-bit image with interleaved (HWC) channels.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pub channels: usize,
    pub height: u32,
    pub width: u32,
    /// Row-major pixels, `channels` bytes per pixel.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wrap interleaved pixels, checking the buffer length.
    pub fn new(
        channels: usize,
        height: u32,
        width: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, FaceDataError> {
        let expected = channels * height as usize * width as usize;
        if channels == 0 || pixels.len() != expected {
            return Err(FaceDataError::ShapeMismatch {
                expected: vec![height as usize, width as usize, channels],
                got: vec![pixels.len()],
            });
        }
        Ok(Self {
            channels,
            height,
            width,
            pixels,
        })
    }

    fn pixel_count(&self) -> usize {
        self.height as usize * self.width as usize
    }

    /// Planar (CHW) copy with values rescaled from `[0, 255]` to `[0, 1]`.
    pub fn to_unit_planes(&self) -> Vec<f32> {
        let plane = self.pixel_count();
        let mut out = vec![0.0f32; plane * self.channels];
        for (pixel_idx, pixel) in self.pixels.chunks_exact(self.channels).enumerate() {
            for (channel, value) in pixel.iter().enumerate() {
                out[channel * plane + pixel_idx] = *value as f32 / 255.0;
            }
        }
        out
    }

    /// Append the channels of `extra` after this image's channels.
    pub fn concat_channels(&self, extra: &DecodedImage) -> Result<DecodedImage, FaceDataError> {
        if (self.height, self.width) != (extra.height, extra.width) {
            return Err(FaceDataError::ShapeMismatch {
                expected: vec![self.height as usize, self.width as usize],
                got: vec![extra.height as usize, extra.width as usize],
            });
        }
        let channels = self.channels + extra.channels;
        let mut pixels = Vec::with_capacity(self.pixel_count() * channels);
        for (left, right) in self
            .pixels
            .chunks_exact(self.channels)
            .zip(extra.pixels.chunks_exact(extra.channels))
        {
            pixels.extend_from_slice(left);
            pixels.extend_from_slice(right);
        }
        Ok(DecodedImage {
            channels,
            height: self.height,
            width: self.width,
            pixels,
        })
    }
}

impl From<image::RgbImage> for DecodedImage {
    fn from(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            channels: RGB_CHANNELS,
            height,
            width,
            pixels: img.into_raw(),
        }
    }
}

fn load(bytes: &[u8], context: &str) -> Result<DynamicImage, FaceDataError> {
    image::load_from_memory(bytes).map_err(|source| FaceDataError::ImageDecode {
        context: context.to_string(),
        source,
    })
}

/// Keep the stored channel count, narrowing wider sample types to 8 bits.
fn native_channels(img: DynamicImage) -> DecodedImage {
    let (channels, width, height, pixels) = match img {
        DynamicImage::ImageLuma8(buf) => (1, buf.width(), buf.height(), buf.into_raw()),
        DynamicImage::ImageLumaA8(buf) => (2, buf.width(), buf.height(), buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.width(), buf.height(), buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.width(), buf.height(), buf.into_raw()),
        other => {
            let color = other.color();
            match (color.channel_count(), color.has_alpha()) {
                (1, _) => {
                    let buf = other.to_luma8();
                    (1, buf.width(), buf.height(), buf.into_raw())
                }
                (2, _) => {
                    let buf = other.to_luma_alpha8();
                    (2, buf.width(), buf.height(), buf.into_raw())
                }
                (_, false) => {
                    let buf = other.to_rgb8();
                    (3, buf.width(), buf.height(), buf.into_raw())
                }
                (_, true) => {
                    let buf = other.to_rgba8();
                    (4, buf.width(), buf.height(), buf.into_raw())
                }
            }
        }
    };
    DecodedImage {
        channels,
        height,
        width,
        pixels,
    }
}

/// Decode any supported encoded image to 3-channel RGB.
pub fn decode_rgb(bytes: &[u8], context: &str) -> Result<DecodedImage, FaceDataError> {
    Ok(load(bytes, context)?.to_rgb8().into())
}

/// Locate two concatenated PNG streams. Bytes before the first signature are ignored.
pub fn split_png_streams(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut starts = Vec::new();
    let mut at = 0usize;
    while at + PNG_SIGNATURE.len() <= bytes.len() {
        if &bytes[at..at + PNG_SIGNATURE.len()] == PNG_SIGNATURE {
            starts.push(at);
            at += PNG_SIGNATURE.len();
        } else {
            at += 1;
        }
    }
    match starts.as_slice() {
        [first, second] => Some((&bytes[*first..*second], &bytes[*second..])),
        _ => None,
    }
}

/// Decode a sample payload according to `format`.
///
/// `context` names the sample in error messages (for example `record 17`).
pub fn decode_planes(
    format: ChannelFormat,
    bytes: &[u8],
    context: &str,
) -> Result<DecodedImage, FaceDataError> {
    match format {
        ChannelFormat::Rgb => decode_rgb(bytes, context),
        ChannelFormat::Rgbd => {
            let decoded = native_channels(load(bytes, context)?);
            if decoded.channels != RGBD_CHANNELS {
                return Err(FaceDataError::UnexpectedChannels {
                    context: context.to_string(),
                    expected: RGBD_CHANNELS,
                    got: decoded.channels,
                });
            }
            Ok(decoded)
        }
        ChannelFormat::Rgbdea => {
            let (rgb_bytes, extra_bytes) =
                split_png_streams(bytes).ok_or_else(|| FaceDataError::ImageDecode {
                    context: context.to_string(),
                    source: ImageError::Decoding(DecodingError::new(
                        ImageFormatHint::Exact(ImageFormat::Png),
                        "rgbdea payload must hold exactly two PNG streams",
                    )),
                })?;
            let rgb = decode_rgb(rgb_bytes, context)?;
            let extra = native_channels(load(extra_bytes, context)?);
            rgb.concat_channels(&extra)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Luma, Rgb, Rgba};
    use std::io::Cursor;

    pub(crate) fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn rgb_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 200]));
        encode_png(DynamicImage::ImageRgb8(img))
    }

    #[test]
    fn rgb_decode_yields_interleaved_pixels() {
        let decoded = decode_planes(ChannelFormat::Rgb, &rgb_png(3, 2), "fixture").unwrap();
        assert_eq!((decoded.channels, decoded.height, decoded.width), (3, 2, 3));
        // pixel (x=2, y=1)
        let at = (3 + 2) * 3;
        assert_eq!(&decoded.pixels[at..at + 3], &[2, 1, 200]);
    }

    #[test]
    fn unit_planes_are_channel_major() {
        let decoded = DecodedImage::new(2, 1, 2, vec![0, 255, 51, 102]).unwrap();
        let planes = decoded.to_unit_planes();
        assert_eq!(planes, vec![0.0, 0.2, 1.0, 0.4]);
    }

    #[test]
    fn rgbd_requires_four_channels() {
        let rgba = image::RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4]));
        let decoded = decode_planes(
            ChannelFormat::Rgbd,
            &encode_png(DynamicImage::ImageRgba8(rgba)),
            "fixture",
        )
        .unwrap();
        assert_eq!(decoded.channels, 4);
        assert_eq!(&decoded.pixels[..4], &[1, 2, 3, 4]);

        let err = decode_planes(ChannelFormat::Rgbd, &rgb_png(2, 2), "fixture").unwrap_err();
        assert!(matches!(
            err,
            FaceDataError::UnexpectedChannels {
                expected: 4,
                got: 3,
                ..
            }
        ));
    }

    #[test]
    fn rgbdea_appends_extra_image_channels() {
        let extra = image::GrayImage::from_pixel(3, 2, Luma([77]));
        let mut payload = rgb_png(3, 2);
        payload.extend(encode_png(DynamicImage::ImageLuma8(extra)));
        let decoded = decode_planes(ChannelFormat::Rgbdea, &payload, "fixture").unwrap();
        assert_eq!(decoded.channels, 4);
        assert_eq!(&decoded.pixels[..4], &[0, 0, 200, 77]);
    }

    #[test]
    fn rgbdea_rejects_single_stream() {
        let err = decode_planes(ChannelFormat::Rgbdea, &rgb_png(2, 2), "fixture").unwrap_err();
        assert!(matches!(err, FaceDataError::ImageDecode { .. }));
    }

    #[test]
    fn garbage_bytes_surface_decode_errors() {
        let err = decode_planes(ChannelFormat::Rgb, b"not an image", "record 4").unwrap_err();
        match err {
            FaceDataError::ImageDecode { context, .. } => assert_eq!(context, "record 4"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
