use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use labwatch_logging::watch_warn;

use crate::digest::ContentDigest;
use crate::normalize::TextNormalizer;
use crate::persist::{AtomicFileWriter, PersistError};

pub const CONTENT_EXTENSION: &str = "html";
pub const DIGEST_EXTENSION: &str = "sha256";

/// One archived capture of a target's raw content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub target_id: String,
    pub captured_at: String,
    pub digest: ContentDigest,
    pub content_path: PathBuf,
    pub digest_path: PathBuf,
}

/// Append-only archive of snapshots, partitioned by target.
pub trait SnapshotStore: Send + Sync {
    /// Persist content, then its digest. Existing snapshots are never replaced.
    fn archive(
        &self,
        target_id: &str,
        captured_at: &str,
        raw: &str,
        digest: &ContentDigest,
    ) -> Result<SnapshotRecord, PersistError>;

    /// Complete snapshots of a target, oldest first.
    fn list(&self, target_id: &str) -> Result<Vec<SnapshotRecord>, PersistError>;

    fn read_content(&self, snapshot: &SnapshotRecord) -> Result<String, PersistError>;
}

/// Stores `<root>/<target>/<timestamp>.html` and `<timestamp>.sha256`.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn target_dir(&self, target_id: &str) -> PathBuf {
        self.root.join(target_id)
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn archive(
        &self,
        target_id: &str,
        captured_at: &str,
        raw: &str,
        digest: &ContentDigest,
    ) -> Result<SnapshotRecord, PersistError> {
        let writer = AtomicFileWriter::new(self.target_dir(target_id));
        let content_path =
            writer.create_new(&format!("{captured_at}.{CONTENT_EXTENSION}"), raw.as_bytes())?;
        let digest_path = writer.create_new(
            &format!("{captured_at}.{DIGEST_EXTENSION}"),
            digest.as_str().as_bytes(),
        )?;
        Ok(SnapshotRecord {
            target_id: target_id.to_string(),
            captured_at: captured_at.to_string(),
            digest: digest.clone(),
            content_path,
            digest_path,
        })
    }

    fn list(&self, target_id: &str) -> Result<Vec<SnapshotRecord>, PersistError> {
        let dir = self.target_dir(target_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut stems: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(CONTENT_EXTENSION))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        stems.sort();

        let mut snapshots = Vec::with_capacity(stems.len());
        for stem in stems {
            let content_path = dir.join(format!("{stem}.{CONTENT_EXTENSION}"));
            let digest_path = dir.join(format!("{stem}.{DIGEST_EXTENSION}"));
            match read_digest(&digest_path)? {
                Some(digest) => snapshots.push(SnapshotRecord {
                    target_id: target_id.to_string(),
                    captured_at: stem,
                    digest,
                    content_path,
                    digest_path,
                }),
                None => watch_warn!(
                    "{}: snapshot {:?} has no valid digest file; skipped",
                    target_id,
                    content_path
                ),
            }
        }
        Ok(snapshots)
    }

    fn read_content(&self, snapshot: &SnapshotRecord) -> Result<String, PersistError> {
        Ok(fs::read_to_string(&snapshot.content_path)?)
    }
}

fn read_digest(path: &Path) -> Result<Option<ContentDigest>, PersistError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(ContentDigest::parse(&text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotVerification {
    pub snapshot: SnapshotRecord,
    pub recomputed: ContentDigest,
}

impl SnapshotVerification {
    pub fn is_intact(&self) -> bool {
        self.snapshot.digest == self.recomputed
    }
}

/// Recompute every archived snapshot's digest from its stored content.
pub fn verify_history(
    store: &dyn SnapshotStore,
    normalizer: &TextNormalizer,
    target_id: &str,
) -> Result<Vec<SnapshotVerification>, PersistError> {
    store
        .list(target_id)?
        .into_iter()
        .map(|snapshot| {
            let content = store.read_content(&snapshot)?;
            let recomputed = ContentDigest::of_text(&normalizer.normalize(&content));
            Ok(SnapshotVerification {
                snapshot,
                recomputed,
            })
        })
        .collect()
}
