use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::IdentityCatalog;

/// Aggregate skew metrics for per-identity sample counts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdentitySkew {
    pub total: usize,
    pub identities: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub max_share: f64,
    pub min_share: f64,
    pub ratio: f64,
    /// Identities with a single sample; same-identity pairs cannot be drawn from them.
    pub singletons: usize,
    pub per_identity: Vec<IdentityShare>,
}

/// Per-identity share of the dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdentityShare {
    pub label: String,
    pub count: usize,
    pub share: f64,
}

/// Compute skew metrics from per-identity counts keyed by label.
pub fn identity_skew(counts: &HashMap<String, usize>) -> Option<IdentitySkew> {
    let min = *counts.values().min()?;
    let max = *counts.values().max()?;
    let total: usize = counts.values().sum();
    let identities = counts.len();
    let mean = total as f64 / identities as f64;
    let share_of = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };
    let ratio = if min == 0 {
        f64::INFINITY
    } else {
        max as f64 / min as f64
    };
    let mut per_identity: Vec<IdentityShare> = counts
        .iter()
        .map(|(label, count)| IdentityShare {
            label: label.clone(),
            count: *count,
            share: share_of(*count),
        })
        .collect();
    per_identity.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    Some(IdentitySkew {
        total,
        identities,
        min,
        max,
        mean,
        max_share: share_of(max),
        min_share: share_of(min),
        ratio,
        singletons: counts.values().filter(|count| **count < 2).count(),
        per_identity,
    })
}

/// Skew metrics for a built catalog.
pub fn catalog_skew(catalog: &IdentityCatalog) -> Option<IdentitySkew> {
    identity_skew(&catalog.identity_sizes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Label;

    #[test]
    fn identity_skew_reports_balance() {
        let mut counts = HashMap::new();
        counts.insert("0".to_string(), 2);
        counts.insert("1".to_string(), 2);
        let skew = identity_skew(&counts).expect("skew");
        assert_eq!(skew.total, 4);
        assert_eq!(skew.identities, 2);
        assert!((skew.max_share - 0.5).abs() < 1e-6);
        assert!((skew.ratio - 1.0).abs() < 1e-6);
        assert_eq!(skew.singletons, 0);
    }

    #[test]
    fn catalog_skew_counts_singletons() {
        let catalog = IdentityCatalog::from_groups([
            (Label::scalar(0.0), vec![1, 2]),
            (Label::scalar(1.0), vec![3]),
            (Label::scalar(2.0), vec![4, 5, 6]),
        ]);
        let skew = catalog_skew(&catalog).expect("skew");
        assert_eq!(skew.total, 6);
        assert_eq!(skew.min, 1);
        assert_eq!(skew.max, 3);
        assert_eq!(skew.singletons, 1);
        assert_eq!(skew.per_identity[0].label, "2");
        assert!((skew.ratio - 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_catalog_has_no_skew() {
        assert!(catalog_skew(&IdentityCatalog::default()).is_none());
    }
}
