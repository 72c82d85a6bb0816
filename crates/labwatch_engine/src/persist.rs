use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("archive directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("refusing to overwrite existing file {0}")]
    AlreadyExists(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure a directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes whole files into one directory through a synced temp file and a rename,
/// so readers only ever see complete content.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `{dir}/{filename}`, replacing any previous content.
    pub fn replace(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        let tmp = self.stage(content)?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Write `{dir}/{filename}`, failing if it already exists.
    pub fn create_new(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        if target.exists() {
            return Err(PersistError::AlreadyExists(target));
        }
        let tmp = self.stage(content)?;
        tmp.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                PersistError::AlreadyExists(target.clone())
            } else {
                PersistError::Io(e.error)
            }
        })?;
        Ok(target)
    }

    fn stage(&self, content: &[u8]) -> Result<NamedTempFile, PersistError> {
        ensure_output_dir(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        Ok(tmp)
    }
}
