use std::fs;
use std::io;
use std::path::PathBuf;

use labwatch_logging::watch_warn;

use crate::digest::ContentDigest;
use crate::persist::{AtomicFileWriter, PersistError};

pub const LEDGER_FILENAME: &str = "last_hash.txt";

/// Last archived digest per target. Absence means no baseline yet.
pub trait HashLedger: Send + Sync {
    fn load(&self, target_id: &str) -> Result<Option<ContentDigest>, PersistError>;
    fn store(&self, target_id: &str, digest: &ContentDigest) -> Result<(), PersistError>;
}

/// Keeps `<root>/<target>/last_hash.txt` holding the bare hex digest.
#[derive(Debug, Clone)]
pub struct FsHashLedger {
    root: PathBuf,
}

impl FsHashLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, target_id: &str) -> PathBuf {
        self.root.join(target_id).join(LEDGER_FILENAME)
    }
}

impl HashLedger for FsHashLedger {
    fn load(&self, target_id: &str) -> Result<Option<ContentDigest>, PersistError> {
        let path = self.path_for(target_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let digest = ContentDigest::parse(&text);
        if digest.is_none() {
            watch_warn!(
                "{}: ledger {:?} holds no valid digest; treating as no baseline",
                target_id,
                path
            );
        }
        Ok(digest)
    }

    fn store(&self, target_id: &str, digest: &ContentDigest) -> Result<(), PersistError> {
        let writer = AtomicFileWriter::new(self.root.join(target_id));
        writer.replace(LEDGER_FILENAME, digest.as_str().as_bytes())?;
        Ok(())
    }
}
