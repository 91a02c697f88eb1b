use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ipscan_logging::scan_debug;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path} missing or not writable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensures `dir` exists and accepts new files, creating it if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let output_dir_error = |reason: String| PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| output_dir_error(e.to_string()))?;
        if !meta.is_dir() {
            return Err(output_dir_error("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| output_dir_error(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| output_dir_error(e.to_string()))?;
    Ok(())
}

/// Writes whole files under one directory via temp file and rename, so a
/// reader never sees a half-written export.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        scan_debug!("Wrote {} bytes to {}", content.len(), target.display());
        Ok(target)
    }
}
