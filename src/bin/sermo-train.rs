//! Fit the classifier, scaler and label encoding from a labeled speech corpus.

use std::path::PathBuf;

use sermo::artifacts::ArtifactStore;
use sermo::config;
use sermo::logging::LogOptions;
use sermo::training::{TrainingReport, train_dummy, train_from_dataset};

const DUMMY_SAMPLES_PER_CLASS: usize = 20;

fn main() {
    if let Err(err) = sermo::logging::init(LogOptions::for_binary("sermo-train")) {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let settings = config::load_or_default()
        .map_err(|err| err.to_string())?
        .normalized();
    let mut training = settings.training.clone();
    if let Some(epochs) = options.epochs {
        training.epochs = epochs.max(1);
    }
    if let Some(seed) = options.seed {
        training.seed = seed;
    }
    let artifacts_dir = match options.artifacts_dir {
        Some(dir) => dir,
        None => settings
            .resolved_artifacts_dir()
            .map_err(|err| err.to_string())?,
    };
    let store = ArtifactStore::new(artifacts_dir);

    let report = if options.dummy {
        println!("Training on random feature vectors...");
        train_dummy(&store, &training, DUMMY_SAMPLES_PER_CLASS)
    } else {
        let dir = options.dataset_dir.ok_or_else(help_text)?;
        if !dir.is_dir() {
            return Err(format!("Dataset path is not a directory: {}", dir.display()));
        }
        println!("Scanning {}...", dir.display());
        train_from_dataset(&dir, &store, &training)
    }
    .map_err(|err| err.to_string())?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &TrainingReport) {
    println!(
        "samples: {} (skipped names {}, failed extractions {})",
        report.samples_used, report.skipped_names, report.failed_extractions
    );
    println!(
        "split: {} train / {} validation",
        report.train_samples, report.validation_samples
    );
    if let Some(epoch) = &report.final_epoch {
        println!(
            "epoch {}: loss={:.4} acc={:.4} val_loss={} val_acc={}",
            epoch.epoch,
            epoch.train_loss,
            epoch.train_accuracy,
            fmt_metric(epoch.val_loss),
            fmt_metric(epoch.val_accuracy)
        );
    }
    if let Some(validation) = &report.validation {
        println!("validation accuracy: {:.4}", validation.accuracy);
        for (idx, stats) in validation.per_class.iter().enumerate() {
            println!(
                "class {:>2} {:<10}  precision={:.3}  recall={:.3}  f1={:.3}  support={}",
                idx, stats.class, stats.precision, stats.recall, stats.f1, stats.support
            );
        }
    }
    println!("artifacts written to {}", report.artifacts_dir.display());
}

fn fmt_metric(value: Option<f32>) -> String {
    value.map_or_else(|| "-".to_string(), |value| format!("{value:.4}"))
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    dataset_dir: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    epochs: Option<usize>,
    seed: Option<u64>,
    dummy: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--dataset" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--dataset requires a value".to_string())?;
                options.dataset_dir = Some(PathBuf::from(value));
            }
            "--artifacts" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--artifacts requires a value".to_string())?;
                options.artifacts_dir = Some(PathBuf::from(value));
            }
            "--epochs" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--epochs requires a value".to_string())?;
                options.epochs = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --epochs value: {value}"))?,
                );
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--dummy" => {
                options.dummy = true;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "sermo-train",
        "",
        "Fits the emotion classifier, feature scaler and label encoding.",
        "",
        "Usage:",
        "  sermo-train --dataset <dir> [--artifacts <dir>]",
        "  sermo-train --dummy [--artifacts <dir>]",
        "",
        "Options:",
        "  --dataset <dir>     Root of the labeled .wav corpus (walked recursively).",
        "  --dummy             Fit on random feature vectors covering all eight emotions.",
        "  --artifacts <dir>   Output directory (default: configured artifacts dir).",
        "  --epochs <n>        Override the configured epoch count.",
        "  --seed <n>          Override the configured seed.",
    ]
    .join("\n")
}
