//! Sample providers consumed by a training loop.
//!
//! Ownership model:
//! - `FaceDataset` owns the record store, the identity catalog, the transform
//!   chain, and the seeded RNG shared by every catalog-backed provider.
//! - Each provider wraps a `FaceDataset` and implements `SampleProvider`.
//! - `VerificationSet` stands alone; it only needs a pickled pair list.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::catalog::IdentityCatalog;
use crate::config::DatasetConfig;
use crate::data::ImageTensor;
use crate::decode::decode_planes;
use crate::errors::FaceDataError;
use crate::record::{IndexedRecordFile, Label, RecordStore, unpack};
use crate::transform::SampleTransform;
use crate::types::RecordKey;

/// Balanced intra/inter-identity pair provider and batch merge.
pub mod balanced;
/// Linear enumeration provider.
pub mod linear;
/// Shared pair drawing policy.
pub mod pairs;
/// Twin (same/different) pair provider.
pub mod twin;
/// Pre-extracted verification pair set.
pub mod verification;

pub use balanced::{BalancedPairProvider, collate_paired};
pub use linear::LinearProvider;
pub use pairs::PairPolicy;
pub use twin::TwinPairProvider;
pub use verification::VerificationSet;

/// Indexable dataset interface.
///
/// `fetch` takes `&self` so several worker threads can share one provider.
pub trait SampleProvider: Send + Sync {
    /// Structured record returned by `fetch`.
    type Item;

    /// Number of addressable items (a synthetic epoch length for pair providers).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produce the item at `index`.
    fn fetch(&self, index: usize) -> Result<Self::Item, FaceDataError>;
}

/// Record store + identity catalog + decode settings shared by catalog-backed providers.
pub struct FaceDataset {
    store: Arc<dyn RecordStore>,
    catalog: IdentityCatalog,
    config: DatasetConfig,
    transform: SampleTransform,
    rng: Mutex<StdRng>,
}

impl FaceDataset {
    /// Open `train.idx` / `train.rec` under `source`, seeding the RNG from `config.seed`.
    pub fn open(source: impl AsRef<Path>, config: DatasetConfig) -> Result<Self, FaceDataError> {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::open_with_rng(source, config, rng)
    }

    /// Open `train.idx` / `train.rec` under `source` with an explicit generator.
    pub fn open_with_rng(
        source: impl AsRef<Path>,
        config: DatasetConfig,
        rng: StdRng,
    ) -> Result<Self, FaceDataError> {
        config.validate()?;
        let store = IndexedRecordFile::open_dir(source)?;
        Self::from_store(Arc::new(store), config, rng)
    }

    /// Build over any record store.
    pub fn from_store(
        store: Arc<dyn RecordStore>,
        config: DatasetConfig,
        rng: StdRng,
    ) -> Result<Self, FaceDataError> {
        config.validate()?;
        let catalog = IdentityCatalog::build(store.as_ref(), config.unknown_header)?;
        let transform = SampleTransform::from_config(&config);
        Ok(Self {
            store,
            catalog,
            config,
            transform,
            rng: Mutex::new(rng),
        })
    }

    pub fn catalog(&self) -> &IdentityCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Run `f` with exclusive access to the shared generator.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> Result<T, FaceDataError> {
        let mut guard = self
            .rng
            .lock()
            .map_err(|_| FaceDataError::Poisoned("dataset rng".into()))?;
        Ok(f(&mut *guard))
    }

    /// Read, decode, and transform the sample stored under `key`.
    pub fn load_sample(&self, key: RecordKey) -> Result<(ImageTensor, Label), FaceDataError> {
        let bytes = self.store.read(key)?;
        let (header, payload) = unpack(key, &bytes)?;
        let image = decode_planes(self.config.channel, payload, &format!("record {key}"))?;
        let flip = self.with_rng(|rng| self.transform.draw_flip(rng))?;
        let tensor = self.transform.apply_with_flip(&image, flip)?;
        Ok((tensor, header.label))
    }
}
