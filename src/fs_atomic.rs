//! Atomic file replacement shared by config and artifact persistence.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// A fully written temporary file waiting to replace `target`.
pub(crate) struct StagedFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    pub(crate) fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the staged file over its target.
    pub(crate) fn commit(self) -> Result<(), std::io::Error> {
        let dir = self.target.parent().map(Path::to_path_buf);
        self.temp
            .persist(&self.target)
            .map_err(|err| err.error)?;
        if let Some(dir) = dir {
            sync_dir(&dir)?;
        }
        Ok(())
    }
}

/// Write `data` into a temp file next to `target` and fsync it, without
/// touching `target` yet. Dropping the result discards the temp file.
pub(crate) fn stage(target: &Path, data: &[u8]) -> Result<StagedFile, std::io::Error> {
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    Ok(StagedFile {
        temp,
        target: target.to_path_buf(),
    })
}

/// Replace `target` with `data` so readers never observe a partial write.
pub(crate) fn atomic_write(target: &Path, data: &[u8]) -> Result<(), std::io::Error> {
    stage(target, data)?.commit()
}

fn sync_dir(dir: &Path) -> Result<(), std::io::Error> {
    #[cfg(unix)]
    {
        std::fs::File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}
