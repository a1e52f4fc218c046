//! Speech emotion recognition: audio ingest, feature extraction, training and serving.
/// Audio decoding, conditioning and the 193-dim feature vector.
pub mod analysis;
/// Per-user app directories (config, logs, artifacts).
pub mod app_dirs;
/// Classifier, scaler and label-encoding persistence.
pub mod artifacts;
/// `config.toml` settings.
pub mod config;
/// Labeled corpus discovery.
pub mod dataset;
/// The eight-category emotion taxonomy.
pub mod emotion;
/// Request-time prediction.
pub mod inference;
/// Tracing subscriber setup for the binaries.
pub mod logging;
/// Classifier capability and preprocessing fits.
pub mod ml;
/// Offline training pipeline.
pub mod training;

pub(crate) mod fs_atomic;
