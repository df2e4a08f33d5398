use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum, error::ErrorKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::catalog::KeyLayout;
use crate::config::{ChannelFormat, DatasetConfig, UnknownHeaderPolicy};
use crate::metrics::{IdentitySkew, catalog_skew};
use crate::provider::{LinearProvider, PairPolicy, SampleProvider, VerificationSet};
use crate::types::VerificationName;
use crate::{FaceDataError, FaceDataset};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChannelArg {
    Rgb,
    Rgbd,
    Rgbdea,
}

impl From<ChannelArg> for ChannelFormat {
    fn from(value: ChannelArg) -> Self {
        match value {
            ChannelArg::Rgb => ChannelFormat::Rgb,
            ChannelArg::Rgbd => ChannelFormat::Rgbd,
            ChannelArg::Rgbdea => ChannelFormat::Rgbdea,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "inspect_dataset",
    disable_help_subcommand = true,
    about = "Inspect an indexed face dataset",
    long_about = "Build the identity catalog of a train.idx/train.rec dataset, report identity skew, dry-run pair sampling, and summarize verification .bin sets.",
    after_help = "Set RUST_LOG=faceset=debug to trace individual pair draws."
)]
struct InspectDatasetCli {
    #[arg(
        long,
        value_name = "DIR",
        help = "Directory holding train.idx/train.rec and any <name>.bin files"
    )]
    source: PathBuf,
    #[arg(
        long,
        value_enum,
        default_value_t = ChannelArg::Rgb,
        help = "Channel layout used when decoding samples"
    )]
    channel: ChannelArg,
    #[arg(long, default_value_t = 42, help = "Seed for the pair sampling dry run")]
    seed: u64,
    #[arg(
        long = "pair-draws",
        default_value_t = 0,
        help = "Number of pair draws to simulate (keys only, no decoding)"
    )]
    pair_draws: usize,
    #[arg(
        long = "decode-check",
        default_value_t = 0,
        help = "Decode this many samples from the start of the linear order"
    )]
    decode_check: usize,
    #[arg(
        long = "strict-header",
        help = "Fail on an unrecognized leading header flag instead of skipping"
    )]
    strict_header: bool,
    #[arg(
        long = "no-catalog",
        help = "Skip the record store; only inspect verification sets"
    )]
    no_catalog: bool,
    #[arg(
        long = "verification",
        value_name = "NAME",
        help = "Verification set name (<NAME>.bin), repeat as needed"
    )]
    verification: Vec<String>,
    #[arg(
        long = "top",
        default_value_t = 5,
        help = "Number of largest identities to list"
    )]
    top: usize,
    #[arg(long, help = "Emit the report as JSON")]
    json: bool,
}

#[derive(Debug, Default, Serialize)]
struct PairDrawReport {
    draws: usize,
    same_identity: usize,
    cross_pool: usize,
    insufficient_samples: usize,
    failures: usize,
}

#[derive(Debug, Serialize)]
struct DecodeReport {
    checked: usize,
    failures: usize,
    shape: Option<Vec<usize>>,
}

#[derive(Debug, Serialize)]
struct CatalogReport {
    layout: String,
    identities: usize,
    samples: usize,
    skew: Option<IdentitySkew>,
    pairs: Option<PairDrawReport>,
    decode: Option<DecodeReport>,
}

#[derive(Debug, Serialize)]
struct VerificationReport {
    name: VerificationName,
    pairs: usize,
    positives: usize,
}

#[derive(Debug, Serialize)]
struct DatasetReport {
    source: PathBuf,
    catalog: Option<CatalogReport>,
    verification: Vec<VerificationReport>,
}

fn describe_layout(layout: Option<&KeyLayout>) -> String {
    match layout {
        Some(KeyLayout::SampleStoring) => "sample-storing".to_string(),
        Some(KeyLayout::RangeLength { end }) => format!("range-length [1, {end})"),
        Some(KeyLayout::Unrecognized { flag }) => format!("unrecognized (flag {flag})"),
        None => "unknown".to_string(),
    }
}

fn simulate_pairs(dataset: &FaceDataset, draws: usize, seed: u64) -> PairDrawReport {
    let catalog = dataset.catalog();
    let policy = PairPolicy::new(catalog);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut report = PairDrawReport {
        draws,
        ..PairDrawReport::default()
    };
    for _ in 0..draws {
        match policy.draw(catalog, &mut rng) {
            Ok(pair) if pair.is_same_identity() => report.same_identity += 1,
            Ok(_) => report.cross_pool += 1,
            Err(FaceDataError::InsufficientSamples { .. }) => report.insufficient_samples += 1,
            Err(_) => report.failures += 1,
        }
    }
    report
}

fn check_decode(provider: &LinearProvider, count: usize) -> DecodeReport {
    let checked = count.min(provider.len());
    let mut failures = 0usize;
    let mut shape = None;
    for index in 0..checked {
        match provider.fetch(index) {
            Ok(sample) => {
                shape.get_or_insert_with(|| sample.images.shape().to_vec());
            }
            Err(err) => {
                failures += 1;
                tracing::warn!(index, error = %err, "[faceset:inspect] sample failed to decode");
            }
        }
    }
    DecodeReport {
        checked,
        failures,
        shape,
    }
}

fn print_report(report: &DatasetReport, top: usize) {
    println!("=== dataset inspection ===");
    println!("source: {}", report.source.display());
    println!();
    if let Some(catalog) = &report.catalog {
        println!("[CATALOG]");
        println!("  layout: {}", catalog.layout);
        println!("  identities: {}", catalog.identities);
        println!("  samples: {}", catalog.samples);
        if let Some(skew) = &catalog.skew {
            println!(
                "  per identity: min={} max={} mean={:.2} ratio={:.2}",
                skew.min, skew.max, skew.mean, skew.ratio
            );
            println!(
                "  single-sample identities: {} (same-identity draws on them fail)",
                skew.singletons
            );
            println!("  largest identities:");
            for share in skew.per_identity.iter().take(top) {
                println!(
                    "    label {} => {} samples ({:.2}%)",
                    share.label,
                    share.count,
                    share.share * 100.0
                );
            }
        }
        if let Some(pairs) = &catalog.pairs {
            println!();
            println!("[PAIR DRY RUN]");
            println!("  draws: {}", pairs.draws);
            println!("  same identity: {}", pairs.same_identity);
            println!("  cross pool: {}", pairs.cross_pool);
            println!("  insufficient samples: {}", pairs.insufficient_samples);
            println!("  other failures: {}", pairs.failures);
        }
        if let Some(decode) = &catalog.decode {
            println!();
            println!("[DECODE CHECK]");
            println!("  checked: {}", decode.checked);
            println!("  failures: {}", decode.failures);
            if let Some(shape) = &decode.shape {
                println!("  sample shape: {shape:?}");
            }
        }
        println!();
    }
    for set in &report.verification {
        println!("[VERIFICATION {}]", set.name);
        println!("  pairs: {}", set.pairs);
        println!("  same: {}", set.positives);
        println!("  different: {}", set.pairs - set.positives);
        println!();
    }
}

/// Run the `inspect_dataset` CLI over `args_iter` (arguments after the program name).
pub fn run_inspect_dataset<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<InspectDatasetCli, _>(
        std::iter::once("inspect_dataset".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let catalog = if cli.no_catalog {
        None
    } else {
        let config = DatasetConfig {
            seed: cli.seed,
            channel: cli.channel.into(),
            flip_probability: 0.0,
            unknown_header: if cli.strict_header {
                UnknownHeaderPolicy::Reject
            } else {
                UnknownHeaderPolicy::Skip
            },
            ..DatasetConfig::default()
        };
        let provider = LinearProvider::open(&cli.source, config)?;
        let dataset = provider.dataset();
        let pairs = (cli.pair_draws > 0).then(|| simulate_pairs(dataset, cli.pair_draws, cli.seed));
        let decode = (cli.decode_check > 0).then(|| check_decode(&provider, cli.decode_check));
        Some(CatalogReport {
            layout: describe_layout(dataset.catalog().layout()),
            identities: dataset.catalog().len(),
            samples: dataset.catalog().sample_count(),
            skew: catalog_skew(dataset.catalog()),
            pairs,
            decode,
        })
    };

    let mut verification = Vec::new();
    for name in &cli.verification {
        let set = VerificationSet::open(&cli.source, name, None)?;
        verification.push(VerificationReport {
            name: name.clone(),
            pairs: set.len(),
            positives: set.positives(),
        });
    }

    let report = DatasetReport {
        source: cli.source.clone(),
        catalog,
        verification,
    };
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, cli.top);
    }
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::tests::three_identity_store;
    use crate::record::{IndexedRecordWriter, RecordStore};
    use tempfile::tempdir;

    fn write_fixture(dir: &std::path::Path) {
        let store = three_identity_store();
        let mut writer = IndexedRecordWriter::create_dir(dir).unwrap();
        for key in store.keys() {
            writer.write(*key, &store.read(*key).unwrap()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn cli_parses_repeated_verification_names() {
        let cli = InspectDatasetCli::try_parse_from([
            "inspect_dataset",
            "--source",
            "/data/faces",
            "--verification",
            "lfw",
            "--verification",
            "cfp_fp",
            "--channel",
            "rgbd",
        ])
        .unwrap();
        assert_eq!(cli.verification, vec!["lfw", "cfp_fp"]);
        assert!(matches!(cli.channel, ChannelArg::Rgbd));
    }

    #[test]
    fn help_exits_cleanly() {
        let result = parse_cli::<InspectDatasetCli, _>(["inspect_dataset", "--help"]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn inspect_runs_over_written_fixture() {
        let temp = tempdir().unwrap();
        write_fixture(temp.path());
        let args = [
            "--source".to_string(),
            temp.path().display().to_string(),
            "--pair-draws".to_string(),
            "100".to_string(),
            "--decode-check".to_string(),
            "6".to_string(),
            "--json".to_string(),
        ];
        run_inspect_dataset(args.into_iter()).unwrap();
    }

    #[test]
    fn simulated_pairs_account_for_every_draw() {
        let temp = tempdir().unwrap();
        write_fixture(temp.path());
        let dataset = FaceDataset::open(temp.path(), DatasetConfig::default()).unwrap();
        let report = simulate_pairs(&dataset, 1_000, 3);
        assert_eq!(
            report.same_identity
                + report.cross_pool
                + report.insufficient_samples
                + report.failures,
            1_000
        );
        assert_eq!(report.failures, 0);
        assert!(report.insufficient_samples > 0);
        assert_eq!(describe_layout(dataset.catalog().layout()), "range-length [1, 7)");
    }
}
