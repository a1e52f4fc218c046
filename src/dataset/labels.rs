use thiserror::Error;

use crate::emotion::Emotion;

/// Why a file name does not carry a usable label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("file name has no third dash-delimited token")]
    MissingToken,
    #[error("unknown emotion code '{0}'")]
    UnknownCode(String),
}

/// Label from names like `03-01-05-01-02-01-12.wav`: the third token is the emotion code.
pub fn label_from_filename(file_name: &str) -> Result<Emotion, LabelError> {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem);
    let code = stem.split('-').nth(2).ok_or(LabelError::MissingToken)?;
    Emotion::from_code(code).ok_or_else(|| LabelError::UnknownCode(code.to_string()))
}
