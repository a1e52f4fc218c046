use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use super::labels::{LabelError, label_from_filename};
use crate::emotion::Emotion;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to read dataset directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledFile {
    pub path: PathBuf,
    pub emotion: Emotion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: LabelError,
}

/// Result of walking a dataset root; both lists are sorted by path.
#[derive(Debug, Clone, Default)]
pub struct DatasetScan {
    pub files: Vec<LabeledFile>,
    pub skipped: Vec<SkippedFile>,
}

/// Recursively collect `.wav` files under `root`, labeling each from its name.
///
/// Files with other extensions are ignored. Unlabelable names are logged and skipped.
pub fn scan_dataset(root: &Path) -> Result<DatasetScan, ScanError> {
    let mut scan = DatasetScan::default();
    visit_dir(root, &mut |path| {
        if !is_wav(path) {
            return;
        }
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        match label_from_filename(name) {
            Ok(emotion) => scan.files.push(LabeledFile {
                path: path.to_path_buf(),
                emotion,
            }),
            Err(reason) => {
                warn!(path = %path.display(), %reason, "Skipping file without a usable label");
                scan.skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason,
                });
            }
        }
    })?;
    scan.files.sort_by(|a, b| a.path.cmp(&b.path));
    scan.skipped.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(scan)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

fn visit_dir(root: &Path, visitor: &mut impl FnMut(&Path)) -> Result<(), ScanError> {
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if dir != root => {
                warn!(
                    dir = %dir.display(),
                    error = %source,
                    "Failed to read directory during dataset scan"
                );
                continue;
            }
            Err(source) => {
                return Err(ScanError::Io {
                    path: dir.clone(),
                    source,
                });
            }
        };
        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        dir = %dir.display(),
                        error = %err,
                        "Failed to read directory entry during dataset scan"
                    );
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "Failed to read file type during dataset scan"
                    );
                    continue;
                }
            };
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                visitor(&path);
            }
        }
    }
    Ok(())
}
