use std::sync::Arc;
use std::time::Duration;

use labwatch_logging::{watch_error, watch_info, watch_warn};

use crate::decode::decode_page;
use crate::digest::ContentDigest;
use crate::fetch::Fetcher;
use crate::filename::TimestampSource;
use crate::ledger::HashLedger;
use crate::normalize::TextNormalizer;
use crate::notify::{MessageTemplate, Notifier};
use crate::persist::PersistError;
use crate::snapshot::SnapshotStore;
use crate::{CheckOutcome, FailureKind, FetchError, MonitorTarget};

/// Upper bound on how long one notification may hold up the polling loop.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("{target}: persistence failed: {source}")]
    Persist {
        target: String,
        #[source]
        source: PersistError,
    },
}

impl MonitorError {
    fn persist(target: &MonitorTarget) -> impl FnOnce(PersistError) -> Self + '_ {
        move |source| MonitorError::Persist {
            target: target.id().to_string(),
            source,
        }
    }
}

/// Runs one fetch, hash, compare and archive pass for a single target.
pub struct TargetMonitor {
    fetcher: Arc<dyn Fetcher>,
    normalizer: TextNormalizer,
    store: Arc<dyn SnapshotStore>,
    ledger: Arc<dyn HashLedger>,
    notifier: Option<Arc<dyn Notifier>>,
    template: MessageTemplate,
    timestamps: TimestampSource,
}

impl TargetMonitor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn SnapshotStore>,
        ledger: Arc<dyn HashLedger>,
        timestamps: TimestampSource,
    ) -> Self {
        Self {
            fetcher,
            normalizer: TextNormalizer::default(),
            store,
            ledger,
            notifier: None,
            template: MessageTemplate::default(),
            timestamps,
        }
    }

    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>, template: MessageTemplate) -> Self {
        self.notifier = Some(notifier);
        self.template = template;
        self
    }

    /// Check `target` against the digest currently held by the ledger.
    pub async fn poll(&self, target: &MonitorTarget) -> Result<CheckOutcome, MonitorError> {
        let previous = self
            .ledger
            .load(target.id())
            .map_err(MonitorError::persist(target))?;
        self.check(target, previous.as_ref()).await
    }

    /// Check `target` against `previous`.
    ///
    /// Writes happen only for a baseline or a change, in the order content,
    /// digest, ledger, so an interrupted write leaves the ledger on the prior
    /// valid digest.
    pub async fn check(
        &self,
        target: &MonitorTarget,
        previous: Option<&ContentDigest>,
    ) -> Result<CheckOutcome, MonitorError> {
        let page = match self.fetch_page(target).await {
            Ok(page) => page,
            Err(err) => {
                watch_warn!("{}: fetch failed: {}", target.id(), err);
                return Ok(CheckOutcome::FetchFailed(err));
            }
        };

        let digest = ContentDigest::of_text(&self.normalizer.normalize(&page));
        if previous == Some(&digest) {
            watch_info!("{}: no change.", target.id());
            return Ok(CheckOutcome::Unchanged(digest));
        }

        let captured_at = (self.timestamps)();
        let snapshot = self
            .store
            .archive(target.id(), &captured_at, &page, &digest)
            .map_err(MonitorError::persist(target))?;
        self.ledger
            .store(target.id(), &digest)
            .map_err(MonitorError::persist(target))?;

        match previous {
            None => {
                watch_info!(
                    "{}: first run, baseline saved as {:?}",
                    target.id(),
                    snapshot.content_path
                );
                Ok(CheckOutcome::BaselineEstablished(snapshot))
            }
            Some(previous) => {
                watch_warn!(
                    "{}: change detected, snapshot saved as {:?}",
                    target.id(),
                    snapshot.content_path
                );
                self.signal(target, &captured_at).await;
                Ok(CheckOutcome::ChangeDetected {
                    previous: previous.clone(),
                    snapshot,
                })
            }
        }
    }

    async fn fetch_page(&self, target: &MonitorTarget) -> Result<String, FetchError> {
        let output = self.fetcher.fetch(target.url()).await?;
        let decoded = decode_page(&output.bytes, output.metadata.content_type.as_deref())
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        Ok(decoded.text)
    }

    async fn signal(&self, target: &MonitorTarget, captured_at: &str) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let message = self.template.render(target.id(), captured_at);
        match tokio::time::timeout(NOTIFY_TIMEOUT, notifier.notify(target.id(), &message)).await {
            Ok(Ok(())) => watch_info!("{}: notification triggered.", target.id()),
            Ok(Err(err)) => watch_error!("{}: notification failed: {}", target.id(), err),
            Err(_) => watch_error!(
                "{}: notification timed out after {:?}",
                target.id(),
                NOTIFY_TIMEOUT
            ),
        }
    }
}
