use std::path::Path;

use thiserror::Error;

/// Containers accepted by the prediction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

/// The upload was rejected before any decode attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unsupported file type for {filename}; only .wav and .mp3 are accepted")]
    UnsupportedExtension { filename: String },
}

impl AudioFormat {
    /// Resolve the allow-listed format from an original upload name.
    pub fn from_filename(filename: &str) -> Result<Self, ValidationError> {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| ValidationError::UnsupportedExtension {
                filename: filename.to_string(),
            })
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("wav") {
            Some(Self::Wav)
        } else if ext.eq_ignore_ascii_case("mp3") {
            Some(Self::Mp3)
        } else {
            None
        }
    }

    /// Extension hint handed to the container probe.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }
}
