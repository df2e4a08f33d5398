#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use faceset::{IndexedRecordWriter, Label, RecordHeader, RecordKey};

/// Identity groups `{A: [1, 2], B: [3], C: [4, 5, 6]}` with labels 10, 20, 30.
pub const GROUPS: [(f32, &[RecordKey]); 3] = [(10.0, &[1, 2]), (20.0, &[3]), (30.0, &[4, 5, 6])];

pub fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([shade, 64, 128]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Red channel value stored for `key`, recoverable after normalization.
pub fn shade_of(key: RecordKey) -> u8 {
    (key * 20) as u8
}

/// Recover the record key from a normalized red channel value.
pub fn key_from_red(value: f32) -> RecordKey {
    let shade = ((value * 0.5 + 0.5) * 255.0).round() as u64;
    shade / 20
}

/// Write the three-identity fixture in the range-length layout.
pub fn write_range_fixture(dir: &Path) {
    let mut writer = IndexedRecordWriter::create_dir(dir).unwrap();
    writer
        .write_packed(0, &RecordHeader::range_declaration(7, 3), &[])
        .unwrap();
    for (label, keys) in GROUPS {
        for key in keys {
            writer
                .write_packed(
                    *key,
                    &RecordHeader::new(Label::scalar(label), *key, 0),
                    &png(4, 4, shade_of(*key)),
                )
                .unwrap();
        }
    }
    writer.finish().unwrap();
}

pub fn label_of(key: RecordKey) -> Option<f32> {
    GROUPS
        .iter()
        .find(|(_, keys)| keys.contains(&key))
        .map(|(label, _)| *label)
}
