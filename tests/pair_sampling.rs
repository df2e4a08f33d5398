mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use ndarray::IxDyn;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::tempdir;

use common::{key_from_red, label_of, write_range_fixture};
use faceset::{
    BalancedPairProvider, DatasetConfig, FaceDataError, FaceDataset, Label, PairKind, PairPolicy,
    Resize, SampleProvider, TwinPairProvider, collate_paired,
};

const DRAWS: usize = 10_000;

fn fixture_dataset(seed: u64) -> (tempfile::TempDir, FaceDataset) {
    let temp = tempdir().unwrap();
    write_range_fixture(temp.path());
    let config = DatasetConfig {
        seed,
        flip_probability: 0.0,
        ..DatasetConfig::default()
    };
    let dataset = FaceDataset::open(temp.path(), config).unwrap();
    (temp, dataset)
}

#[test]
fn policy_properties_hold_over_many_draws() {
    let (_temp, dataset) = fixture_dataset(0);
    let catalog = dataset.catalog();
    let policy = PairPolicy::new(catalog);
    let upper: HashSet<u64> = policy.upper().iter().copied().collect();
    let lower: HashSet<u64> = policy.lower().iter().copied().collect();
    assert_eq!(upper, HashSet::from([1, 2, 4, 5, 6]));
    assert_eq!(lower, HashSet::from([3]));

    let mut rng = StdRng::seed_from_u64(1234);
    let (mut same, mut cross, mut insufficient) = (0usize, 0usize, 0usize);
    for _ in 0..DRAWS {
        match policy.draw(catalog, &mut rng) {
            Ok(pair) => match pair.kind {
                PairKind::SameIdentity => {
                    same += 1;
                    assert_ne!(pair.first, pair.second);
                    assert_eq!(catalog.label_of(pair.first), catalog.label_of(pair.second));
                    assert_ne!(catalog.label_of(pair.first), Some(&Label::scalar(20.0)));
                }
                PairKind::CrossPool => {
                    cross += 1;
                    assert!(upper.contains(&pair.first));
                    assert!(lower.contains(&pair.second));
                    assert_ne!(catalog.label_of(pair.first), catalog.label_of(pair.second));
                }
            },
            Err(FaceDataError::InsufficientSamples { label, available }) => {
                insufficient += 1;
                assert_eq!(label, "20");
                assert_eq!(available, 1);
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(same + cross + insufficient, DRAWS);
    // Half the draws take the same-identity branch; a third of those hit B.
    let same_branch = (same + insufficient) as f64 / DRAWS as f64;
    assert!((same_branch - 0.5).abs() < 0.03, "same branch share {same_branch}");
    let singleton_share = insufficient as f64 / (same + insufficient) as f64;
    assert!((singleton_share - 1.0 / 3.0).abs() < 0.04, "singleton share {singleton_share}");
}

#[test]
fn identical_seeds_draw_identical_sequences() {
    let (_temp, dataset) = fixture_dataset(0);
    let policy = PairPolicy::new(dataset.catalog());
    let run = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..200)
            .map(|_| {
                policy
                    .draw(dataset.catalog(), &mut rng)
                    .map(|pair| (pair.first, pair.second))
                    .ok()
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(77), run(77));
    assert_ne!(run(77), run(78));
}

#[test]
fn balanced_fetch_decodes_the_drawn_keys() {
    let (_temp, dataset) = fixture_dataset(11);
    let provider = BalancedPairProvider::new(dataset);
    let mut fetched = Vec::new();
    while fetched.len() < 25 {
        match provider.fetch(0) {
            Ok(batch) => fetched.push(batch),
            Err(FaceDataError::InsufficientSamples { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    for batch in &fetched {
        assert_eq!(batch.images.shape(), &[2, 3, 4, 4]);
        for slot in 0..2 {
            let red = batch.images[IxDyn(&[slot, 0, 0, 0])];
            let key = key_from_red(red);
            let label = batch.person_ids[IxDyn(&[slot])];
            assert_eq!(label_of(key).map(|value| value as i64), Some(label));
        }
    }

    let merged = collate_paired(&fetched).unwrap();
    assert_eq!(merged.images.shape(), &[50, 3, 4, 4]);
    assert_eq!(merged.person_ids.shape(), &[50]);
}

#[test]
fn twin_same_flag_tracks_label_equality() {
    let (_temp, dataset) = fixture_dataset(5);
    let provider = TwinPairProvider::new(dataset);
    let (mut same, mut different) = (0usize, 0usize);
    for _ in 0..500 {
        let sample = match provider.fetch(0) {
            Ok(sample) => sample,
            Err(FaceDataError::InsufficientSamples { .. }) => continue,
            Err(other) => panic!("unexpected error: {other}"),
        };
        assert_eq!(sample.images.shape(), &[6, 4, 4]);
        let first = key_from_red(sample.images[IxDyn(&[0, 0, 0])]);
        let second = key_from_red(sample.images[IxDyn(&[3, 0, 0])]);
        assert_eq!(sample.same, label_of(first) == label_of(second));
        if sample.same {
            same += 1;
        } else {
            different += 1;
        }
    }
    assert!(same > 0 && different > 0);
}

#[test]
fn resize_config_shapes_every_pair() {
    let temp = tempdir().unwrap();
    write_range_fixture(temp.path());
    let config = DatasetConfig {
        resize: Some(Resize::new(8, 6)),
        ..DatasetConfig::default()
    };
    let provider = BalancedPairProvider::open(temp.path(), config).unwrap();
    let batch = loop {
        if let Ok(batch) = provider.fetch(0) {
            break batch;
        }
    };
    assert_eq!(batch.images.shape(), &[2, 3, 8, 6]);
}

#[test]
fn providers_can_be_shared_across_workers() {
    let (_temp, dataset) = fixture_dataset(3);
    let provider = Arc::new(BalancedPairProvider::new(dataset));
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || {
                let mut ok = 0usize;
                for index in 0..50 {
                    match provider.fetch(worker * 50 + index) {
                        Ok(_) => ok += 1,
                        Err(FaceDataError::InsufficientSamples { .. }) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
                ok
            })
        })
        .collect();
    let total: usize = handles.into_iter().map(|handle| handle.join().unwrap()).sum();
    assert!(total > 0);
}
