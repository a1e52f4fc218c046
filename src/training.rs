//! Offline fit of the scaler, label encoding and classifier from a labeled corpus.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::{AudioFormat, FEATURE_DIM, extract_from_path};
use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::config::TrainingSettings;
use crate::dataset::{ScanError, scan_dataset};
use crate::emotion::Emotion;
use crate::ml::metrics::{EvaluationReport, evaluate};
use crate::ml::split::train_validation_split;
use crate::ml::{
    ConvNetOptions, EpochStats, LabelEncoding, StandardScaler, TrainDataset, train_conv_net,
};

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("No usable training files under {root}")]
    EmptyDataset { root: PathBuf },
    #[error("Need at least 2 emotion classes to train, found {found:?}")]
    TooFewClasses { found: Vec<String> },
    #[error("Preprocessing failed: {0}")]
    Preprocess(String),
    #[error("Classifier training failed: {0}")]
    Fit(String),
    #[error(transparent)]
    Artifacts(#[from] ArtifactError),
}

/// Summary of a completed training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub samples_used: usize,
    pub skipped_names: usize,
    pub failed_extractions: usize,
    pub classes: Vec<String>,
    pub train_samples: usize,
    pub validation_samples: usize,
    pub final_epoch: Option<EpochStats>,
    pub validation: Option<EvaluationReport>,
    pub artifacts_dir: PathBuf,
}

/// Feature rows and their labels, before any fitting.
#[derive(Debug, Clone, Default)]
pub struct LabeledFeatures {
    pub rows: Vec<Vec<f32>>,
    pub labels: Vec<String>,
}

/// Walk `root`, extract a feature vector per labeled `.wav`, fit everything and persist the trio.
pub fn train_from_dataset(
    root: &Path,
    store: &ArtifactStore,
    settings: &TrainingSettings,
) -> Result<TrainingReport, TrainingError> {
    let scan = scan_dataset(root)?;
    info!(
        root = %root.display(),
        files = scan.files.len(),
        skipped = scan.skipped.len(),
        "Dataset scan finished"
    );
    let mut features = LabeledFeatures::default();
    let mut failed_extractions = 0usize;
    for file in &scan.files {
        match extract_from_path(&file.path, AudioFormat::Wav) {
            Ok(vector) => {
                features.rows.push(vector.into_inner());
                features.labels.push(file.emotion.as_str().to_string());
            }
            Err(err) => {
                failed_extractions += 1;
                warn!(path = %file.path.display(), error = %err, "Skipping file that failed feature extraction");
            }
        }
    }
    if features.rows.is_empty() {
        return Err(TrainingError::EmptyDataset {
            root: root.to_path_buf(),
        });
    }
    let mut report = fit_and_persist(features, store, settings)?;
    report.skipped_names = scan.skipped.len();
    report.failed_extractions = failed_extractions;
    Ok(report)
}

/// Fit the trio on random feature vectors covering the full taxonomy.
pub fn train_dummy(
    store: &ArtifactStore,
    settings: &TrainingSettings,
    samples_per_class: usize,
) -> Result<TrainingReport, TrainingError> {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut features = LabeledFeatures::default();
    for emotion in Emotion::ALL {
        for _ in 0..samples_per_class.max(1) {
            features
                .rows
                .push((0..FEATURE_DIM).map(|_| rng.random_range(-1.0f32..1.0)).collect());
            features.labels.push(emotion.as_str().to_string());
        }
    }
    info!(samples = features.rows.len(), "Training on random feature vectors");
    fit_and_persist(features, store, settings)
}

/// Encode labels, standardize, split, train, evaluate and write all three artifacts.
pub fn fit_and_persist(
    features: LabeledFeatures,
    store: &ArtifactStore,
    settings: &TrainingSettings,
) -> Result<TrainingReport, TrainingError> {
    if features.rows.is_empty() {
        return Err(TrainingError::EmptyDataset {
            root: store.dir().to_path_buf(),
        });
    }
    let encoding = LabelEncoding::fit(&features.labels).map_err(TrainingError::Preprocess)?;
    if encoding.len() < 2 {
        return Err(TrainingError::TooFewClasses {
            found: encoding.classes().to_vec(),
        });
    }
    let y = features
        .labels
        .iter()
        .map(|label| {
            encoding
                .encode(label)
                .ok_or_else(|| format!("Label '{label}' missing from encoding"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(TrainingError::Preprocess)?;
    let scaler = StandardScaler::fit(&features.rows).map_err(TrainingError::Preprocess)?;
    let scaled = scaler
        .transform_rows(&features.rows)
        .map_err(TrainingError::Preprocess)?;
    let dataset = TrainDataset {
        x: scaled,
        y,
        n_classes: encoding.len(),
    };

    let (train_idx, val_idx) =
        train_validation_split(dataset.len(), settings.validation_fraction, settings.seed);
    let train = dataset.subset(&train_idx);
    let validation = dataset.subset(&val_idx);
    info!(
        train = train.len(),
        validation = validation.len(),
        classes = ?encoding.classes(),
        "Fitting classifier"
    );
    let fit = train_conv_net(&train, &validation, &ConvNetOptions::from(settings))
        .map_err(TrainingError::Fit)?;
    let validation_report = if validation.is_empty() {
        None
    } else {
        Some(evaluate(&fit.model, &validation, &encoding).map_err(TrainingError::Fit)?)
    };

    store.save_all(&fit.model, &scaler, &encoding)?;
    info!(dir = %store.dir().display(), "Saved classifier, scaler and label encoding");

    Ok(TrainingReport {
        samples_used: dataset.len(),
        skipped_names: 0,
        failed_extractions: 0,
        classes: encoding.classes().to_vec(),
        train_samples: train.len(),
        validation_samples: validation.len(),
        final_epoch: fit.history.last().copied(),
        validation: validation_report,
        artifacts_dir: store.dir().to_path_buf(),
    })
}
