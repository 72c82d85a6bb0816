#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use labwatch_engine::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, Fetcher, FsHashLedger, FsSnapshotStore,
    MonitorTarget, Notifier, NotifyError, TargetMonitor, TimestampSource,
};
use url::Url;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(labwatch_logging::initialize_for_tests);
}

pub fn page(body: &str) -> String {
    format!(
        r#"<html><head><title>Report</title></head><body><form id="form1">{body}</form></body></html>"#
    )
}

/// Serves whatever page was last set, counting requests.
#[derive(Default)]
pub struct ScriptedFetcher {
    current: Mutex<Option<Result<String, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn serving(html: &str) -> Arc<Self> {
        let fetcher = Arc::new(Self::default());
        fetcher.set_page(html);
        fetcher
    }

    pub fn set_page(&self, html: &str) {
        *self.current.lock().unwrap() = Some(Ok(html.to_string()));
    }

    pub fn set_failure(&self, kind: FailureKind) {
        *self.current.lock().unwrap() = Some(Err(FetchError::new(kind, "scripted failure")));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchOutput, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.current.lock().unwrap().clone();
        let html = current.unwrap_or_else(|| Err(FetchError::new(FailureKind::Network, "no page")))?;
        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                content_type: Some("text/html; charset=utf-8".to_string()),
                byte_len: html.len() as u64,
            },
            bytes: html.into_bytes(),
        })
    }
}

/// Records every message; optionally fails each call.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, target_id: &str, message: &str) -> Result<(), NotifyError> {
        self.messages
            .lock()
            .unwrap()
            .push((target_id.to_string(), message.to_string()));
        if self.fail {
            return Err(NotifyError::Spawn {
                program: "recording".to_string(),
                source: std::io::Error::other("delivery refused"),
            });
        }
        Ok(())
    }
}

/// Deterministic, strictly increasing snapshot labels.
pub fn counting_timestamps() -> TimestampSource {
    let counter = Arc::new(AtomicUsize::new(0));
    Arc::new(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        format!("20240101_{:06}_UTC", 100000 + n)
    })
}

pub fn target(id: &str) -> MonitorTarget {
    MonitorTarget::from_template("http://lis.example.test/Patient_Report.aspx/{id}", id).unwrap()
}

pub fn monitor_in(
    root: &std::path::Path,
    fetcher: Arc<ScriptedFetcher>,
) -> TargetMonitor {
    TargetMonitor::new(
        fetcher,
        Arc::new(FsSnapshotStore::new(root)),
        Arc::new(FsHashLedger::new(root)),
        counting_timestamps(),
    )
}
