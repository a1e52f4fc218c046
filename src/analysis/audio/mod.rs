//! Audio ingest: probe, windowed decode, resample and signal conditioning.
//!
//! Every clip leaving this module is mono, at [`SAMPLE_RATE`], and exactly
//! [`CANONICAL_LEN`] samples long.

mod condition;
mod decode;
mod fallback;
mod format;
mod ingest;
mod probe;
mod resample;

use thiserror::Error;

pub use condition::{TARGET_RMS, condition, fix_length, normalize_rms, pre_emphasis, rms};
pub use format::{AudioFormat, ValidationError};
pub use ingest::{DecodePath, IngestedClip, ingest};
pub use probe::{start_offset_seconds, probe_duration_seconds};
pub use resample::resample_linear;

/// Canonical sample rate shared by training and serving.
pub const SAMPLE_RATE: u32 = 22_050;
/// Length of the analysed window in seconds.
pub const CLIP_SECONDS: f32 = 3.0;
/// Number of samples in a conditioned clip.
pub const CANONICAL_LEN: usize = SAMPLE_RATE as usize * 3;
/// Recordings longer than this skip [`LONG_RECORDING_OFFSET_SECONDS`] of lead-in.
pub const LONG_RECORDING_SECONDS: f32 = 4.0;
pub const LONG_RECORDING_OFFSET_SECONDS: f32 = 0.5;
/// Duration assumed when the container does not report one.
pub const ASSUMED_DURATION_SECONDS: f32 = 5.0;

/// Failure to turn an audio resource into a usable feature vector.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Audio decode failed: {0}")]
    Decode(String),
    #[error("Decoded audio is empty")]
    Empty,
    #[error("Feature extraction produced a non-finite value at index {index}")]
    NonFinite { index: usize },
    #[error("Decode and feature extraction exceeded {timeout_ms} ms")]
    TimedOut { timeout_ms: u128 },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// Mix interleaved frames down to one channel by averaging.
pub(crate) fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.iter().copied().map(sanitize_sample).collect();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().copied().map(sanitize_sample).sum();
            sum / channels as f32
        })
        .collect()
}

fn sanitize_sample(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
