use std::fs;
use std::path::Path;

use serde_pickle::{DeOptions, Value};
use tracing::info;

use crate::config::Resize;
use crate::constants::layout::VERIFICATION_EXTENSION;
use crate::data::VerificationPair;
use crate::decode::{DecodedImage, decode_rgb};
use crate::errors::FaceDataError;
use crate::provider::SampleProvider;
use crate::record::indexed::require_file;
use crate::transform::SampleTransform;
use crate::types::EncodedImage;

/// Fixed verification benchmark loaded from `<name>.bin`.
///
/// Every image is decoded when the set is loaded; fetches only resize and
/// normalize.
pub struct VerificationSet {
    a: Vec<DecodedImage>,
    b: Vec<DecodedImage>,
    same: Vec<bool>,
    transform: SampleTransform,
}

impl VerificationSet {
    /// Load `<source>/<name>.bin`.
    pub fn open(
        source: impl AsRef<Path>,
        name: &str,
        resize: Option<Resize>,
    ) -> Result<Self, FaceDataError> {
        validate_resize(resize)?;
        let path = source
            .as_ref()
            .join(format!("{name}.{VERIFICATION_EXTENSION}"));
        require_file(&path)?;
        let set = Self::from_pickle(&fs::read(&path)?, resize)?;
        info!(
            path = %path.display(),
            pairs = set.len(),
            "[faceset:verification] verification set loaded"
        );
        Ok(set)
    }

    /// Parse a pickled `(interleaved_images, issame_list)` tuple.
    pub fn from_pickle(bytes: &[u8], resize: Option<Resize>) -> Result<Self, FaceDataError> {
        let value = serde_pickle::value_from_slice(bytes, DeOptions::new())?;
        let (images, same) = split_pickle_tuple(value)?;
        Self::from_parts(images, same, resize)
    }

    /// Build from interleaved encoded images (`A0, B0, A1, B1, ...`) and labels.
    pub fn from_parts(
        images: Vec<EncodedImage>,
        same: Vec<bool>,
        resize: Option<Resize>,
    ) -> Result<Self, FaceDataError> {
        validate_resize(resize)?;
        if images.len() % 2 != 0 {
            return Err(FaceDataError::VerificationFormat(format!(
                "expected an even number of images, got {}",
                images.len()
            )));
        }
        let pairs = images.len() / 2;
        if same.len() != pairs {
            return Err(FaceDataError::VerificationFormat(format!(
                "{pairs} image pairs but {} same/different labels",
                same.len()
            )));
        }
        let mut a = Vec::with_capacity(pairs);
        let mut b = Vec::with_capacity(pairs);
        for (idx, encoded) in images.iter().enumerate() {
            let decoded = decode_rgb(encoded, &format!("verification image {idx}"))?;
            if idx % 2 == 0 {
                a.push(decoded);
            } else {
                b.push(decoded);
            }
        }
        Ok(Self {
            a,
            b,
            same,
            transform: SampleTransform::evaluation(resize),
        })
    }

    /// Ground-truth labels in pair order.
    pub fn same_list(&self) -> &[bool] {
        &self.same
    }

    /// Number of pairs labelled "same".
    pub fn positives(&self) -> usize {
        self.same.iter().filter(|same| **same).count()
    }
}

impl SampleProvider for VerificationSet {
    type Item = VerificationPair;

    fn len(&self) -> usize {
        self.a.len()
    }

    fn fetch(&self, index: usize) -> Result<VerificationPair, FaceDataError> {
        let len = self.len();
        let out_of_range = || FaceDataError::IndexOutOfRange { index, len };
        let a = self.a.get(index).ok_or_else(out_of_range)?;
        let b = self.b.get(index).ok_or_else(out_of_range)?;
        let same = *self.same.get(index).ok_or_else(out_of_range)?;
        Ok(VerificationPair {
            id: index,
            a: self.transform.apply_with_flip(a, false)?,
            b: self.transform.apply_with_flip(b, false)?,
            same,
        })
    }
}

fn validate_resize(resize: Option<Resize>) -> Result<(), FaceDataError> {
    match resize {
        Some(target) => target.validate(),
        None => Ok(()),
    }
}

fn sequence(value: Value, what: &str) -> Result<Vec<Value>, FaceDataError> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items),
        other => Err(FaceDataError::VerificationFormat(format!(
            "{what} must be a list or tuple, got {}",
            value_kind(&other)
        ))),
    }
}

fn split_pickle_tuple(value: Value) -> Result<(Vec<EncodedImage>, Vec<bool>), FaceDataError> {
    let mut parts = sequence(value, "top-level object")?;
    if parts.len() != 2 {
        return Err(FaceDataError::VerificationFormat(format!(
            "top-level tuple must hold (images, issame_list), got {} items",
            parts.len()
        )));
    }
    let same_value = parts.pop().unwrap_or(Value::None);
    let images_value = parts.pop().unwrap_or(Value::None);

    let images = sequence(images_value, "image list")?
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Bytes(bytes) => Ok(bytes),
            other => Err(FaceDataError::VerificationFormat(format!(
                "image {idx} is not a byte string: {}",
                value_kind(&other)
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let same = sequence(same_value, "issame list")?
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Bool(flag) => Ok(flag),
            Value::I64(0) => Ok(false),
            Value::I64(1) => Ok(true),
            other => Err(FaceDataError::VerificationFormat(format!(
                "issame entry {idx} is not a boolean: {}",
                value_kind(&other)
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((images, same))
}

fn value_kind(value: &Value) -> &'static str {
    #[allow(unreachable_patterns)]
    match value {
        Value::None => "None",
        Value::Bool(_) => "bool",
        Value::I64(_) | Value::Int(_) => "int",
        Value::F64(_) => "float",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "str",
        Value::List(_) => "list",
        Value::Tuple(_) => "tuple",
        Value::Set(_) | Value::FrozenSet(_) => "set",
        Value::Dict(_) => "dict",
        _ => "object",
    }
}
