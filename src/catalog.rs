//! Identity catalog: label -> ordered sample keys.
//!
//! The catalog is built once from a record store and never mutated. Labels
//! iterate in first-seen order; keys keep candidate-set order within a label.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::config::UnknownHeaderPolicy;
use crate::constants::catalog::{
    FIRST_RANGE_KEY, FLAG_RANGE_LENGTH, FLAG_SAMPLE_STORING, LEADING_KEY,
};
use crate::errors::FaceDataError;
use crate::record::{Label, RecordStore};
use crate::types::RecordKey;

/// How the leading record describes the sample key space.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyLayout {
    /// Every store key holds a sample.
    SampleStoring,
    /// Samples occupy keys `[1, end)`.
    RangeLength { end: RecordKey },
    /// Unrecognized leading flag; no samples are discovered.
    Unrecognized { flag: u32 },
}

impl KeyLayout {
    /// Sample keys present in `store`, plus how many declared keys are absent.
    ///
    /// Range candidates come from the store's own keys, so a huge declared end
    /// costs nothing beyond the store size.
    fn candidates(&self, store: &dyn RecordStore) -> (Vec<RecordKey>, u64) {
        match self {
            KeyLayout::SampleStoring => (store.keys().to_vec(), 0),
            KeyLayout::RangeLength { end } => {
                let range = FIRST_RANGE_KEY..*end;
                let mut keys: Vec<RecordKey> = store
                    .keys()
                    .iter()
                    .copied()
                    .filter(|key| range.contains(key))
                    .collect();
                keys.sort_unstable();
                keys.dedup();
                let declared = end.saturating_sub(FIRST_RANGE_KEY);
                let missing = declared.saturating_sub(keys.len() as u64);
                (keys, missing)
            }
            KeyLayout::Unrecognized { .. } => (Vec::new(), 0),
        }
    }
}

/// Read key 0 and classify the store layout.
pub fn detect_layout(
    store: &dyn RecordStore,
    policy: UnknownHeaderPolicy,
) -> Result<KeyLayout, FaceDataError> {
    let header = store.read_header(LEADING_KEY)?;
    match header.flag {
        FLAG_SAMPLE_STORING => Ok(KeyLayout::SampleStoring),
        FLAG_RANGE_LENGTH => {
            let end = header.label.first().unwrap_or(0.0);
            // Negative or NaN counts declare an empty range.
            let end = if end.is_finite() && end > 0.0 {
                end as RecordKey
            } else {
                0
            };
            Ok(KeyLayout::RangeLength { end })
        }
        flag => match policy {
            UnknownHeaderPolicy::Skip => {
                warn!(
                    flag,
                    "[faceset:catalog] unrecognized leading header flag; no samples discovered"
                );
                Ok(KeyLayout::Unrecognized { flag })
            }
            UnknownHeaderPolicy::Reject => Err(FaceDataError::UnrecognizedHeader { flag }),
        },
    }
}

/// Mapping from identity label to the ordered keys of its samples.
#[derive(Clone, Debug, Default)]
pub struct IdentityCatalog {
    identities: IndexMap<Label, Vec<RecordKey>>,
    owners: HashMap<RecordKey, usize>,
    layout: Option<KeyLayout>,
}

impl IdentityCatalog {
    /// Scan `store` once and group sample keys by label.
    pub fn build(
        store: &dyn RecordStore,
        policy: UnknownHeaderPolicy,
    ) -> Result<Self, FaceDataError> {
        let layout = detect_layout(store, policy)?;
        let (candidates, missing) = layout.candidates(store);
        let mut catalog = IdentityCatalog {
            layout: Some(layout),
            ..IdentityCatalog::default()
        };
        for key in candidates {
            let header = store.read_header(key)?;
            catalog.push(header.label, key);
        }
        if missing > 0 {
            warn!(
                missing,
                "[faceset:catalog] candidate keys absent from the store were skipped"
            );
        }
        info!(
            identities = catalog.len(),
            samples = catalog.sample_count(),
            "[faceset:catalog] identity catalog built"
        );
        Ok(catalog)
    }

    /// Build a catalog directly from `(label, keys)` groups in order.
    ///
    /// A key listed twice stays with the first group that claimed it.
    pub fn from_groups<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = (Label, Vec<RecordKey>)>,
    {
        let mut catalog = IdentityCatalog::default();
        for (label, keys) in groups {
            for key in keys {
                catalog.push(label.clone(), key);
            }
        }
        catalog
    }

    fn push(&mut self, label: Label, key: RecordKey) {
        if self.owners.contains_key(&key) {
            return;
        }
        let entry = self.identities.entry(label);
        let position = entry.index();
        entry.or_default().push(key);
        self.owners.insert(key, position);
    }

    /// Layout detected from the leading record, when built from a store.
    pub fn layout(&self) -> Option<&KeyLayout> {
        self.layout.as_ref()
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Total number of sample keys across all identities.
    pub fn sample_count(&self) -> usize {
        self.owners.len()
    }

    /// Keys of `label`, if present.
    pub fn get(&self, label: &Label) -> Option<&[RecordKey]> {
        self.identities.get(label).map(Vec::as_slice)
    }

    /// Identity at catalog position `index`.
    pub fn get_index(&self, index: usize) -> Option<(&Label, &[RecordKey])> {
        self.identities
            .get_index(index)
            .map(|(label, keys)| (label, keys.as_slice()))
    }

    /// Label owning `key`.
    pub fn label_of(&self, key: RecordKey) -> Option<&Label> {
        let position = *self.owners.get(&key)?;
        self.identities.get_index(position).map(|(label, _)| label)
    }

    /// Catalog position of the identity owning `key`.
    pub fn position_of(&self, key: RecordKey) -> Option<usize> {
        self.owners.get(&key).copied()
    }

    /// Identities in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&Label, &[RecordKey])> {
        self.identities
            .iter()
            .map(|(label, keys)| (label, keys.as_slice()))
    }

    /// All keys concatenated in catalog order.
    pub fn flattened_keys(&self) -> Vec<RecordKey> {
        self.identities.values().flatten().copied().collect()
    }

    /// Set of every key in the catalog.
    pub fn key_set(&self) -> HashSet<RecordKey> {
        self.owners.keys().copied().collect()
    }

    /// Per-identity sample counts keyed by label display string.
    pub fn identity_sizes(&self) -> HashMap<String, usize> {
        self.identities
            .iter()
            .map(|(label, keys)| (label.to_string(), keys.len()))
            .collect()
    }
}
