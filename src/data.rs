use ndarray::{ArrayD, Axis, concatenate, stack};
use serde::{Deserialize, Serialize};

use crate::errors::FaceDataError;
use crate::types::RecordKey;

/// Normalized image data: `[C, H, W]` per sample, `[N, C, H, W]` per batch.
pub type ImageTensor = ArrayD<f32>;
/// Identity labels stored as integers (0-d for single-value labels).
pub type LabelTensor = ArrayD<i64>;

/// One decoded sample from the linear provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaceSample {
    /// `[C, H, W]` normalized image.
    pub images: ImageTensor,
    /// Identity label (scalar for single-value labels).
    pub person_ids: LabelTensor,
}

/// Stacked samples from the balanced pair provider, or a collated batch of them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaceBatch {
    /// `[N, C, H, W]` normalized images (`N = 2` per fetched pair).
    pub images: ImageTensor,
    /// Labels stacked along the leading dimension.
    pub person_ids: LabelTensor,
}

/// Channel-concatenated pair from the twin provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TwinSample {
    /// `[2C, H, W]`: first sample's channels followed by the second's.
    pub images: ImageTensor,
    /// True when both samples carry the same identity label.
    pub same: bool,
}

/// One entry of a verification benchmark.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationPair {
    /// Position of the pair in the set.
    pub id: usize,
    /// `[3, H, W]` anchor image in `[-1, 1]`.
    #[serde(rename = "A")]
    pub a: ImageTensor,
    /// `[3, H, W]` counterpart image in `[-1, 1]`.
    #[serde(rename = "B")]
    pub b: ImageTensor,
    /// Ground-truth same/different flag.
    pub same: bool,
}

/// Which branch of the pair policy produced a pair.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PairKind {
    /// Two distinct keys of one identity.
    SameIdentity,
    /// One key from the even-position pool and one from the odd-position pool.
    CrossPool,
}

/// Two sample keys drawn by the pair policy.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pair {
    pub first: RecordKey,
    pub second: RecordKey,
    pub kind: PairKind,
}

impl Pair {
    /// True for same-identity draws; cross-pool draws never share an identity.
    pub fn is_same_identity(&self) -> bool {
        self.kind == PairKind::SameIdentity
    }
}

fn shape_mismatch(expected: &[usize], got: &[usize]) -> FaceDataError {
    FaceDataError::ShapeMismatch {
        expected: expected.to_vec(),
        got: got.to_vec(),
    }
}

/// Stack same-shaped arrays along a new leading axis.
pub fn stack_leading<T: Clone>(items: &[ArrayD<T>]) -> Result<ArrayD<T>, FaceDataError> {
    let first = items
        .first()
        .ok_or_else(|| FaceDataError::EmptyPool("cannot stack zero arrays".into()))?;
    if let Some(other) = items.iter().find(|item| item.shape() != first.shape()) {
        return Err(shape_mismatch(first.shape(), other.shape()));
    }
    let views: Vec<_> = items.iter().map(ArrayD::view).collect();
    stack(Axis(0), &views).map_err(|_| shape_mismatch(first.shape(), first.shape()))
}

/// Concatenate arrays along their existing leading axis.
///
/// Trailing axes must match; 0-d arrays cannot be concatenated.
pub fn concat_leading<T: Clone>(items: &[ArrayD<T>]) -> Result<ArrayD<T>, FaceDataError> {
    let first = items
        .first()
        .ok_or_else(|| FaceDataError::EmptyPool("cannot concatenate zero arrays".into()))?;
    if first.ndim() == 0 {
        return Err(shape_mismatch(&[1], first.shape()));
    }
    let trailing = &first.shape()[1..];
    if let Some(other) = items
        .iter()
        .find(|item| item.ndim() != first.ndim() || &item.shape()[1..] != trailing)
    {
        return Err(shape_mismatch(first.shape(), other.shape()));
    }
    let views: Vec<_> = items.iter().map(ArrayD::view).collect();
    concatenate(Axis(0), &views).map_err(|_| shape_mismatch(first.shape(), first.shape()))
}
