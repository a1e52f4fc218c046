//! The classifier / scaler / label-encoding trio on disk.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::analysis::FEATURE_DIM;
use crate::fs_atomic;
use crate::ml::{ConvNetModel, LabelEncoding, StandardScaler};

pub const CLASSIFIER_FILE_NAME: &str = "classifier.json";
pub const SCALER_FILE_NAME: &str = "scaler.json";
pub const LABEL_ENCODING_FILE_NAME: &str = "label_encoding.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Classifier,
    Scaler,
    LabelEncoding,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::Classifier, Self::Scaler, Self::LabelEncoding];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Classifier => CLASSIFIER_FILE_NAME,
            Self::Scaler => SCALER_FILE_NAME,
            Self::LabelEncoding => LABEL_ENCODING_FILE_NAME,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classifier => "classifier",
            Self::Scaler => "scaler",
            Self::LabelEncoding => "label encoding",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{kind} artifact not found at {path}")]
    Missing { kind: ArtifactKind, path: PathBuf },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid {kind} artifact at {path}: {reason}")]
    Invalid {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },
    #[error("Failed to serialize {kind} artifact: {source}")]
    Serialize {
        kind: ArtifactKind,
        source: serde_json::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

/// A directory holding the three artifacts; each can be loaded on its own.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    pub fn load_classifier(&self) -> Result<ConvNetModel, ArtifactError> {
        let kind = ArtifactKind::Classifier;
        let model: ConvNetModel = self.read_json(kind)?;
        model
            .validate()
            .and_then(|()| {
                if model.input_len == FEATURE_DIM {
                    Ok(())
                } else {
                    Err(format!(
                        "input_len {} (expected {FEATURE_DIM})",
                        model.input_len
                    ))
                }
            })
            .map_err(|reason| self.invalid(kind, reason))?;
        Ok(model)
    }

    pub fn load_scaler(&self) -> Result<StandardScaler, ArtifactError> {
        let kind = ArtifactKind::Scaler;
        let scaler: StandardScaler = self.read_json(kind)?;
        scaler
            .validate(FEATURE_DIM)
            .map_err(|reason| self.invalid(kind, reason))?;
        Ok(scaler)
    }

    pub fn load_label_encoding(&self) -> Result<LabelEncoding, ArtifactError> {
        self.read_json(ArtifactKind::LabelEncoding)
    }

    /// Write all three artifacts; none is replaced until every one is staged.
    pub fn save_all(
        &self,
        classifier: &ConvNetModel,
        scaler: &StandardScaler,
        encoding: &LabelEncoding,
    ) -> Result<(), ArtifactError> {
        if classifier.n_classes != encoding.len() {
            return Err(self.invalid(
                ArtifactKind::Classifier,
                format!(
                    "classifier has {} outputs but the encoding has {} classes",
                    classifier.n_classes,
                    encoding.len()
                ),
            ));
        }
        let staged = [
            self.stage(ArtifactKind::Classifier, classifier)?,
            self.stage(ArtifactKind::Scaler, scaler)?,
            self.stage(ArtifactKind::LabelEncoding, encoding)?,
        ];
        for file in staged {
            let path = file.target().to_path_buf();
            file.commit()
                .map_err(|source| ArtifactError::Write { path, source })?;
        }
        Ok(())
    }

    fn stage<T: Serialize>(
        &self,
        kind: ArtifactKind,
        value: &T,
    ) -> Result<fs_atomic::StagedFile, ArtifactError> {
        let path = self.path(kind);
        let data = serde_json::to_vec_pretty(value)
            .map_err(|source| ArtifactError::Serialize { kind, source })?;
        fs_atomic::stage(&path, &data).map_err(|source| ArtifactError::Write { path, source })
    }

    fn read_json<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<T, ArtifactError> {
        let path = self.path(kind);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::Missing { kind, path });
            }
            Err(source) => return Err(ArtifactError::Read { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse { path, source })
    }

    fn invalid(&self, kind: ArtifactKind, reason: String) -> ArtifactError {
        ArtifactError::Invalid {
            kind,
            path: self.path(kind),
            reason,
        }
    }
}
