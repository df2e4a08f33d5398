use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::RecordKey;

/// Error type for record IO, catalog construction, decoding, and sampling failures.
#[derive(Debug, Error)]
pub enum FaceDataError {
    #[error("required file '{}' does not exist", path.display())]
    MissingFile { path: PathBuf },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed index line {line}: {details}")]
    MalformedIndex { line: usize, details: String },
    #[error("malformed record at key {key}: {details}")]
    MalformedRecord { key: RecordKey, details: String },
    #[error("record key {key} is not present in the store")]
    MissingRecord { key: RecordKey },
    #[error("leading record header carries unrecognized flag {flag}")]
    UnrecognizedHeader { flag: u32 },
    #[error("identity {label} has {available} sample(s); same-identity pairs need at least 2")]
    InsufficientSamples { label: String, available: usize },
    #[error("no samples available: {0}")]
    EmptyPool(String),
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("image decode failed for {context}: {source}")]
    ImageDecode {
        context: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{context}: expected {expected} channel(s), decoded {got}")]
    UnexpectedChannels {
        context: String,
        expected: usize,
        got: usize,
    },
    #[error(transparent)]
    Pickle(#[from] serde_pickle::Error),
    #[error("verification set is malformed: {0}")]
    VerificationFormat(String),
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}
