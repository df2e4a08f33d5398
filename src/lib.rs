#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Identity catalog built from record headers.
pub mod catalog;
/// Dataset configuration types.
pub mod config;
/// Centralized constants for the record format, catalog layout, and providers.
pub mod constants;
/// Sample and pair record types.
pub mod data;
/// Image decoding and channel layouts.
pub mod decode;
/// Reusable example runners shared by downstream crates.
pub mod example_apps;
/// Identity skew metrics.
pub mod metrics;
/// Sample providers and the shared dataset handle.
pub mod provider;
/// RecordIO framing, sample headers, and indexed record files.
pub mod record;
/// Flip, resize, and normalization applied to decoded images.
pub mod transform;
/// Shared type aliases.
pub mod types;

mod errors;

pub use catalog::{IdentityCatalog, KeyLayout};
pub use config::{ChannelFormat, DatasetConfig, Normalization, Resize, UnknownHeaderPolicy};
pub use data::{
    FaceBatch, FaceSample, ImageTensor, LabelTensor, Pair, PairKind, TwinSample, VerificationPair,
    concat_leading, stack_leading,
};
pub use decode::DecodedImage;
pub use errors::FaceDataError;
pub use metrics::{IdentityShare, IdentitySkew, catalog_skew, identity_skew};
pub use provider::{
    BalancedPairProvider, FaceDataset, LinearProvider, PairPolicy, SampleProvider,
    TwinPairProvider, VerificationSet, collate_paired,
};
pub use record::{
    InMemoryRecordStore, IndexedRecordFile, IndexedRecordWriter, Label, RecordHeader, RecordStore,
    pack, unpack,
};
pub use transform::SampleTransform;
pub use types::{EncodedImage, RecordBytes, RecordKey, RecordOffset, VerificationName};
