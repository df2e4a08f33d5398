use std::path::Path;

use crate::config::DatasetConfig;
use crate::constants::provider::EPOCH_LENGTH;
use crate::data::{Pair, TwinSample, concat_leading};
use crate::errors::FaceDataError;
use crate::provider::{FaceDataset, PairPolicy, SampleProvider};

/// Pair provider that fuses both samples along channels and labels them same/different.
pub struct TwinPairProvider {
    dataset: FaceDataset,
    policy: PairPolicy,
}

impl TwinPairProvider {
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

    pub fn draw_pair(&self) -> Result<Pair, FaceDataError> {
        self.dataset
            .with_rng(|rng| self.policy.draw(self.dataset.catalog(), rng))?
    }
}

impl SampleProvider for TwinPairProvider {
    type Item = TwinSample;

    fn len(&self) -> usize {
        EPOCH_LENGTH
    }

    fn fetch(&self, _index: usize) -> Result<TwinSample, FaceDataError> {
        let pair = self.draw_pair()?;
        let (first_image, first_label) = self.dataset.load_sample(pair.first)?;
        let (second_image, second_label) = self.dataset.load_sample(pair.second)?;
        Ok(TwinSample {
            images: concat_leading(&[first_image, second_image])?,
            same: first_label == second_label,
        })
    }
}
