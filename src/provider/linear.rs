use std::path::Path;

use crate::config::DatasetConfig;
use crate::data::FaceSample;
use crate::errors::FaceDataError;
use crate::provider::{FaceDataset, SampleProvider};
use crate::types::RecordKey;

/// Enumerates every sample once, identities in catalog order.
pub struct LinearProvider {
    dataset: FaceDataset,
    sample_keys: Vec<RecordKey>,
}

impl LinearProvider {
    pub fn new(dataset: FaceDataset) -> Self {
        let sample_keys = dataset.catalog().flattened_keys();
        Self {
            dataset,
            sample_keys,
        }
    }

    /// Open the dataset under `source` and enumerate it.
    pub fn open(source: impl AsRef<Path>, config: DatasetConfig) -> Result<Self, FaceDataError> {
        Ok(Self::new(FaceDataset::open(source, config)?))
    }

    pub fn dataset(&self) -> &FaceDataset {
        &self.dataset
    }

    /// Record key served at `index`.
    pub fn key_at(&self, index: usize) -> Option<RecordKey> {
        self.sample_keys.get(index).copied()
    }
}

impl SampleProvider for LinearProvider {
    type Item = FaceSample;

    fn len(&self) -> usize {
        self.sample_keys.len()
    }

    fn fetch(&self, index: usize) -> Result<FaceSample, FaceDataError> {
        let key = self.key_at(index).ok_or(FaceDataError::IndexOutOfRange {
            index,
            len: self.sample_keys.len(),
        })?;
        let (images, label) = self.dataset.load_sample(key)?;
        Ok(FaceSample {
            images,
            person_ids: label.to_tensor(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::tests::{dataset, no_flip};

    #[test]
    fn length_matches_sample_count_and_order_follows_catalog() {
        let provider = LinearProvider::new(dataset(no_flip(), 0));
        assert_eq!(provider.len(), 6);
        let keys: Vec<_> = (0..provider.len())
            .map(|idx| provider.key_at(idx).unwrap())
            .collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn fetch_returns_owning_identity() {
        let provider = LinearProvider::new(dataset(no_flip(), 0));
        let expected: [i64; 6] = [0, 0, 1, 2, 2, 2];
        for (idx, label) in expected.iter().enumerate() {
            let sample = provider.fetch(idx).unwrap();
            assert_eq!(sample.person_ids.ndim(), 0);
            assert_eq!(sample.person_ids.iter().copied().collect::<Vec<_>>(), vec![*label]);
            assert_eq!(sample.images.shape(), &[3, 2, 2]);
        }
    }

    #[test]
    fn fetch_is_repeatable_without_flip() {
        let provider = LinearProvider::new(dataset(no_flip(), 0));
        let first = provider.fetch(3).unwrap();
        let second = provider.fetch(3).unwrap();
        assert_eq!(first.images, second.images);
    }

    #[test]
    fn fetch_out_of_range_errors() {
        let provider = LinearProvider::new(dataset(no_flip(), 0));
        assert!(matches!(
            provider.fetch(6),
            Err(FaceDataError::IndexOutOfRange { index: 6, len: 6 })
        ));
    }
}
