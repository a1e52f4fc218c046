//! Audio-to-feature pipeline shared by training and serving.

pub mod audio;
pub mod features;
pub(crate) mod frequency_domain;

use std::path::Path;

use tracing::debug;

pub use audio::{AudioFormat, ExtractionError, ValidationError};
pub use features::{FEATURE_DIM, FeatureVector};

/// Ingest, condition and describe one audio resource.
///
/// The trainer and the inference orchestrator both go through this function, so a given
/// byte buffer always yields the same vector on either side.
pub fn extract_from_bytes(
    bytes: &[u8],
    format: AudioFormat,
) -> Result<FeatureVector, ExtractionError> {
    let clip = audio::ingest(bytes, format)?;
    debug!(
        decode_path = ?clip.decode_path,
        offset_seconds = clip.offset_seconds,
        "Conditioned clip ready for feature extraction"
    );
    features::extract_features(&clip.samples)
}

/// Read a file and run [`extract_from_bytes`] on its contents.
pub fn extract_from_path(path: &Path, format: AudioFormat) -> Result<FeatureVector, ExtractionError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    extract_from_bytes(&bytes, format)
}
