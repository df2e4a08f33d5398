use std::path::Path;

use crate::config::DatasetConfig;
use crate::constants::provider::EPOCH_LENGTH;
use crate::data::{FaceBatch, Pair, concat_leading, stack_leading};
use crate::errors::FaceDataError;
use crate::provider::{FaceDataset, PairPolicy, SampleProvider};

/// Draws same-identity and cross-identity pairs with equal probability.
///
/// Sampling is with replacement; `fetch` ignores its index and the reported
/// length is a fixed epoch size.
pub struct BalancedPairProvider {
    dataset: FaceDataset,
    policy: PairPolicy,
}

impl BalancedPairProvider {
    pub fn new(dataset: FaceDataset) -> Self {
        let policy = PairPolicy::new(dataset.catalog());
        Self { dataset, policy }
    }

    pub fn open(source: impl AsRef<Path>, config: DatasetConfig) -> Result<Self, FaceDataError> {
        Ok(Self::new(FaceDataset::open(source, config)?))
    }

    pub fn dataset(&self) -> &FaceDataset {
        &self.dataset
    }

    pub fn policy(&self) -> &PairPolicy {
        &self.policy
    }

    /// Draw the next pair of keys without decoding them.
    pub fn draw_pair(&self) -> Result<Pair, FaceDataError> {
        self.dataset
            .with_rng(|rng| self.policy.draw(self.dataset.catalog(), rng))?
    }
}

impl SampleProvider for BalancedPairProvider {
    type Item = FaceBatch;

    fn len(&self) -> usize {
        EPOCH_LENGTH
    }

    fn fetch(&self, _index: usize) -> Result<FaceBatch, FaceDataError> {
        let pair = self.draw_pair()?;
        let (first_image, first_label) = self.dataset.load_sample(pair.first)?;
        let (second_image, second_label) = self.dataset.load_sample(pair.second)?;
        Ok(FaceBatch {
            images: stack_leading(&[first_image, second_image])?,
            person_ids: stack_leading(&[first_label.to_tensor(), second_label.to_tensor()])?,
        })
    }
}

/// Merge fetched pair batches by concatenating each field along dimension 0.
pub fn collate_paired(batch: &[FaceBatch]) -> Result<FaceBatch, FaceDataError> {
    if batch.is_empty() {
        return Err(FaceDataError::EmptyPool("cannot collate an empty batch".into()));
    }
    let images: Vec<_> = batch.iter().map(|item| item.images.clone()).collect();
    let person_ids: Vec<_> = batch.iter().map(|item| item.person_ids.clone()).collect();
    Ok(FaceBatch {
        images: concat_leading(&images)?,
        person_ids: concat_leading(&person_ids)?,
    })
}
