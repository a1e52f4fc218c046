use tracing::{debug, warn};

use super::{
    AudioFormat, CANONICAL_LEN, ExtractionError, condition::condition, decode::decode_window,
    fallback::decode_full_and_window, probe::probe_duration_seconds, probe::start_offset_seconds,
};

/// Which decoder produced the clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePath {
    Primary,
    Fallback,
}

/// A conditioned, canonical-length mono clip.
#[derive(Debug, Clone)]
pub struct IngestedClip {
    pub samples: Vec<f32>,
    pub offset_seconds: f32,
    pub decode_path: DecodePath,
}

/// Probe, decode the analysis window and condition it to [`CANONICAL_LEN`] samples.
pub fn ingest(bytes: &[u8], format: AudioFormat) -> Result<IngestedClip, ExtractionError> {
    let duration = probe_duration_seconds(bytes, format);
    let offset_seconds = start_offset_seconds(duration);
    debug!(
        ?format,
        duration = ?duration,
        offset_seconds,
        "Probed audio before decode"
    );
    let (window, decode_path) = match decode_window(bytes, format, offset_seconds) {
        Ok(window) => (window, DecodePath::Primary),
        Err(primary_err) => {
            warn!(?format, error = %primary_err, "Primary decode failed, retrying with fallback reader");
            let window = decode_full_and_window(bytes, format, offset_seconds)?;
            (window, DecodePath::Fallback)
        }
    };
    let samples = condition(window);
    debug_assert_eq!(samples.len(), CANONICAL_LEN);
    Ok(IngestedClip {
        samples,
        offset_seconds,
        decode_path,
    })
}
