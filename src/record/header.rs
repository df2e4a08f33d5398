use std::fmt;
use std::hash::{Hash, Hasher};

use ndarray::{Array1, arr0};
use serde::{Deserialize, Serialize};

use crate::constants::record::SAMPLE_HEADER_LEN;
use crate::data::LabelTensor;
use crate::errors::FaceDataError;
use crate::types::RecordKey;

/// Identity label carried by a record header: one or more `f32` values.
///
/// Never empty. Equality and hashing compare bit patterns so labels can key a map.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Label(Vec<f32>);

impl Label {
    pub fn scalar(value: f32) -> Self {
        Self(vec![value])
    }

    /// Label holding `values`; fails when `values` is empty.
    pub fn from_values(values: Vec<f32>) -> Result<Self, FaceDataError> {
        if values.is_empty() {
            return Err(FaceDataError::InvalidConfiguration(
                "a label needs at least one value".to_string(),
            ));
        }
        Ok(Self(values))
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn first(&self) -> Option<f32> {
        self.0.first().copied()
    }

    pub fn is_scalar(&self) -> bool {
        self.0.len() == 1
    }

    /// Integer label tensor: a scalar for single-value labels, 1-D otherwise.
    ///
    /// Values truncate toward zero.
    pub fn to_tensor(&self) -> LabelTensor {
        match self.0.as_slice() {
            [value] => arr0(*value as i64).into_dyn(),
            values => Array1::from_iter(values.iter().map(|value| *value as i64)).into_dyn(),
        }
    }
}

impl TryFrom<Vec<f32>> for Label {
    type Error = FaceDataError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::from_values(values)
    }
}

impl From<Label> for Vec<f32> {
    fn from(label: Label) -> Self {
        label.0
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(left, right)| left.to_bits() == right.to_bits())
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for value in &self.0 {
            value.to_bits().hash(state);
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            return write!(f, "{}", self.0[0]);
        }
        f.write_str("[")?;
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

/// Decoded record header.
///
/// `flag` is 0 for scalar labels and the label length for array labels. The
/// leading record of a range-length store reuses the array form with `flag == 2`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub flag: u32,
    pub label: Label,
    pub id: u64,
    pub id2: u64,
}

impl RecordHeader {
    /// Header whose `flag` follows from the label shape.
    pub fn new(label: Label, id: u64, id2: u64) -> Self {
        let flag = packed_flag(&label);
        Self {
            flag,
            label,
            id,
            id2,
        }
    }

    /// Header-only record declaring the sample key range `[1, end)`.
    pub fn range_declaration(end: RecordKey, identities: u64) -> Self {
        Self::new(Label(vec![end as f32, identities as f32]), 0, 0)
    }
}

fn packed_flag(label: &Label) -> u32 {
    if label.is_scalar() {
        0
    } else {
        label.values().len() as u32
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// Split record bytes into the decoded header and the remaining payload.
///
/// `key` is only used for error context.
pub fn unpack(key: RecordKey, bytes: &[u8]) -> Result<(RecordHeader, &[u8]), FaceDataError> {
    if bytes.len() < SAMPLE_HEADER_LEN {
        return Err(FaceDataError::MalformedRecord {
            key,
            details: format!(
                "record holds {} bytes, header needs {SAMPLE_HEADER_LEN}",
                bytes.len()
            ),
        });
    }
    let flag = read_u32(bytes, 0);
    let scalar = f32::from_bits(read_u32(bytes, 4));
    let id = read_u64(bytes, 8);
    let id2 = read_u64(bytes, 16);
    let rest = &bytes[SAMPLE_HEADER_LEN..];
    if flag == 0 {
        let header = RecordHeader {
            flag,
            label: Label::scalar(scalar),
            id,
            id2,
        };
        return Ok((header, rest));
    }
    let label_len = flag as usize * 4;
    if rest.len() < label_len {
        return Err(FaceDataError::MalformedRecord {
            key,
            details: format!(
                "header declares {flag} label values but only {} bytes follow",
                rest.len()
            ),
        });
    }
    let values: Vec<f32> = rest[..label_len]
        .chunks_exact(4)
        .map(|chunk| f32::from_bits(read_u32(chunk, 0)))
        .collect();
    let header = RecordHeader {
        flag,
        label: Label(values),
        id,
        id2,
    };
    Ok((header, &rest[label_len..]))
}

/// Encode `header` followed by `payload`.
///
/// Single-value labels are written inline with `flag = 0`; longer labels set
/// `flag` to their length and follow the fixed header.
pub fn pack(header: &RecordHeader, payload: &[u8]) -> Vec<u8> {
    let flag = packed_flag(&header.label);
    let extra = if flag == 0 { 0 } else { flag as usize * 4 };
    let mut out = Vec::with_capacity(SAMPLE_HEADER_LEN + extra + payload.len());
    out.extend_from_slice(&flag.to_le_bytes());
    let inline = if flag == 0 {
        header.label.first().unwrap_or(0.0)
    } else {
        0.0
    };
    out.extend_from_slice(&inline.to_le_bytes());
    out.extend_from_slice(&header.id.to_le_bytes());
    out.extend_from_slice(&header.id2.to_le_bytes());
    if flag > 0 {
        for value in header.label.values() {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out.extend_from_slice(payload);
    out
}
