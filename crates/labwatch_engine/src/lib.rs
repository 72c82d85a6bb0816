//! Labwatch engine: fetching, change detection and snapshot archival.
mod decode;
mod digest;
mod extract;
mod fetch;
mod filename;
mod ledger;
mod monitor;
mod normalize;
mod notify;
mod persist;
mod scheduler;
mod snapshot;
mod types;

pub use decode::{decode_page, DecodeError, DecodedPage};
pub use digest::ContentDigest;
pub use extract::{ExtractError, Extractor, LabReportExtractor};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{sanitize_label, validate_target_id, zoned_timestamps, TimestampSource};
pub use ledger::{FsHashLedger, HashLedger, LEDGER_FILENAME};
pub use monitor::{MonitorError, TargetMonitor};
pub use normalize::{NormalizeError, TextNormalizer, DEFAULT_CONTENT_SELECTOR};
pub use notify::{CommandNotifier, MessageTemplate, Notifier, NotifyError, DEFAULT_TEMPLATE};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use scheduler::{CycleSummary, Scheduler};
pub use snapshot::{
    verify_history, FsSnapshotStore, SnapshotRecord, SnapshotStore, SnapshotVerification,
    CONTENT_EXTENSION, DIGEST_EXTENSION,
};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    CheckOutcome, FailureKind, FetchError, FetchMetadata, FetchOutput, MonitorTarget,
    TargetError, TargetRegistry, ID_PLACEHOLDER,
};
