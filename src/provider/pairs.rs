use rand::Rng;
use rand::seq::{IndexedRandom, index};
use tracing::debug;

use crate::catalog::IdentityCatalog;
use crate::constants::provider::SAME_IDENTITY_THRESHOLD;
use crate::data::{Pair, PairKind};
use crate::errors::FaceDataError;
use crate::types::RecordKey;

/// Same/different pair drawing over a catalog.
///
/// Identities at even catalog positions feed the upper pool and odd positions
/// the lower pool, so a cross-pool pair never shares an identity.
#[derive(Clone, Debug, Default)]
pub struct PairPolicy {
    upper: Vec<RecordKey>,
    lower: Vec<RecordKey>,
}

impl PairPolicy {
    /// Partition `catalog` into parity pools.
    pub fn new(catalog: &IdentityCatalog) -> Self {
        let mut policy = PairPolicy::default();
        for (position, (_, keys)) in catalog.iter().enumerate() {
            if position % 2 == 0 {
                policy.upper.extend_from_slice(keys);
            } else {
                policy.lower.extend_from_slice(keys);
            }
        }
        policy
    }

    /// Keys of even-position identities.
    pub fn upper(&self) -> &[RecordKey] {
        &self.upper
    }

    /// Keys of odd-position identities.
    pub fn lower(&self) -> &[RecordKey] {
        &self.lower
    }

    /// Draw a same-identity pair with probability 0.5, else a cross-pool pair.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        catalog: &IdentityCatalog,
        rng: &mut R,
    ) -> Result<Pair, FaceDataError> {
        if rng.random::<f64>() > SAME_IDENTITY_THRESHOLD {
            self.draw_same(catalog, rng)
        } else {
            self.draw_different(rng)
        }
    }

    /// Pick an identity uniformly, then two distinct keys from it.
    pub fn draw_same<R: Rng + ?Sized>(
        &self,
        catalog: &IdentityCatalog,
        rng: &mut R,
    ) -> Result<Pair, FaceDataError> {
        if catalog.is_empty() {
            return Err(FaceDataError::EmptyPool(
                "catalog has no identities to draw a same-identity pair from".into(),
            ));
        }
        let position = rng.random_range(0..catalog.len());
        let (label, keys) = catalog.get_index(position).ok_or_else(|| {
            FaceDataError::EmptyPool(format!("no identity at position {position}"))
        })?;
        if keys.len() < 2 {
            return Err(FaceDataError::InsufficientSamples {
                label: label.to_string(),
                available: keys.len(),
            });
        }
        let picks = index::sample(rng, keys.len(), 2);
        let pair = Pair {
            first: keys[picks.index(0)],
            second: keys[picks.index(1)],
            kind: PairKind::SameIdentity,
        };
        debug!(
            first = pair.first,
            second = pair.second,
            %label,
            "[faceset:pairs] same-identity draw"
        );
        Ok(pair)
    }

    /// One key from each parity pool.
    pub fn draw_different<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Pair, FaceDataError> {
        let first = *self.upper.choose(rng).ok_or_else(|| {
            FaceDataError::EmptyPool("upper pool (even-position identities) is empty".into())
        })?;
        let second = *self.lower.choose(rng).ok_or_else(|| {
            FaceDataError::EmptyPool("lower pool (odd-position identities) is empty".into())
        })?;
        debug!(first, second, "[faceset:pairs] cross-pool draw");
        Ok(Pair {
            first,
            second,
            kind: PairKind::CrossPool,
        })
    }
}
