//! Record store interfaces and implementations.
//!
//! Ownership model:
//! - `RecordStore` is the provider-facing interface: ordered keys plus
//!   random-access reads of reassembled record bytes.
//! - `IndexedRecordFile` serves `.idx`/`.rec` pairs from a read-only memory map,
//!   so concurrent `read` calls need no locking.
//! - `InMemoryRecordStore` holds packed records in memory for fixtures and tools.

use std::collections::HashMap;

use crate::errors::FaceDataError;
use crate::types::{RecordBytes, RecordKey};

/// Frame-level encoding and decoding of record bytes.
pub mod frame;
/// Sample header codec and label type.
pub mod header;
/// File-backed indexed store and writer.
pub mod indexed;

pub use header::{Label, RecordHeader, pack, unpack};
pub use indexed::{IndexedRecordFile, IndexedRecordWriter};

/// Random-access store of opaque byte records keyed by integer.
///
/// `read` must be safe to call concurrently from several threads.
pub trait RecordStore: Send + Sync {
    /// All keys in store order (index-file order for file-backed stores).
    fn keys(&self) -> &[RecordKey];
    /// True when `key` resolves to a record.
    fn contains(&self, key: RecordKey) -> bool;
    /// Read the full record bytes (header + payload) stored under `key`.
    fn read(&self, key: RecordKey) -> Result<RecordBytes, FaceDataError>;

    /// Number of records in the store.
    fn len(&self) -> usize {
        self.keys().len()
    }

    /// True when the store holds no records.
    fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Read and unpack the header stored under `key`.
    fn read_header(&self, key: RecordKey) -> Result<RecordHeader, FaceDataError> {
        let bytes = self.read(key)?;
        let (header, _) = unpack(key, &bytes)?;
        Ok(header)
    }
}

/// Record store held entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRecordStore {
    keys: Vec<RecordKey>,
    records: HashMap<RecordKey, RecordBytes>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert raw record bytes. Re-inserting a key replaces its bytes in place.
    pub fn insert(&mut self, key: RecordKey, bytes: RecordBytes) {
        if self.records.insert(key, bytes).is_none() {
            self.keys.push(key);
        }
    }

    /// Pack `header` + `payload` and insert it under `key`.
    pub fn insert_packed(&mut self, key: RecordKey, header: &RecordHeader, payload: &[u8]) {
        self.insert(key, pack(header, payload));
    }

    /// Builder-style variant of `insert_packed`.
    pub fn with_packed(mut self, key: RecordKey, header: &RecordHeader, payload: &[u8]) -> Self {
        self.insert_packed(key, header, payload);
        self
    }
}

impl RecordStore for InMemoryRecordStore {
    fn keys(&self) -> &[RecordKey] {
        &self.keys
    }

    fn contains(&self, key: RecordKey) -> bool {
        self.records.contains_key(&key)
    }

    fn read(&self, key: RecordKey) -> Result<RecordBytes, FaceDataError> {
        self.records
            .get(&key)
            .cloned()
            .ok_or(FaceDataError::MissingRecord { key })
    }
}
