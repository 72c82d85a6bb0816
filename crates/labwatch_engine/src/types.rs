use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::digest::ContentDigest;
use crate::filename::validate_target_id;
use crate::snapshot::SnapshotRecord;

/// Placeholder substituted with the target id in a locator template.
pub const ID_PLACEHOLDER: &str = "{id}";

/// One monitored record source. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorTarget {
    id: String,
    url: Url,
}

impl MonitorTarget {
    pub fn new(id: impl Into<String>, url: &str) -> Result<Self, TargetError> {
        let id = id.into();
        validate_target_id(&id)?;
        let url = Url::parse(url).map_err(|err| TargetError::InvalidUrl {
            id: id.clone(),
            message: err.to_string(),
        })?;
        Ok(Self { id, url })
    }

    /// Build a target by substituting `{id}` in `template`.
    pub fn from_template(template: &str, id: impl Into<String>) -> Result<Self, TargetError> {
        if !template.contains(ID_PLACEHOLDER) {
            return Err(TargetError::MissingPlaceholder);
        }
        let id = id.into();
        let url = template.replace(ID_PLACEHOLDER, &id);
        Self::new(id, &url)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Ordered set of targets with unique ids, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRegistry {
    targets: Vec<MonitorTarget>,
}

impl TargetRegistry {
    pub fn new(targets: Vec<MonitorTarget>) -> Result<Self, TargetError> {
        let mut seen = HashSet::new();
        for target in &targets {
            if !seen.insert(target.id()) {
                return Err(TargetError::Duplicate(target.id().to_string()));
            }
        }
        Ok(Self { targets })
    }

    pub fn from_template<I, S>(template: &str, ids: I) -> Result<Self, TargetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets = ids
            .into_iter()
            .map(|id| MonitorTarget::from_template(template, id))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(targets)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonitorTarget> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target id must not be empty")]
    EmptyId,
    #[error("target id {0:?} is not a safe directory name")]
    UnsafeId(String),
    #[error("duplicate target id {0:?}")]
    Duplicate(String),
    #[error("locator template lacks the {{id}} placeholder")]
    MissingPlaceholder,
    #[error("invalid url for target {id:?}: {message}")]
    InvalidUrl { id: String, message: String },
}

/// Result of one polling check for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No ledger entry existed; the first snapshot was archived.
    BaselineEstablished(SnapshotRecord),
    Unchanged(ContentDigest),
    ChangeDetected {
        previous: ContentDigest,
        snapshot: SnapshotRecord,
    },
    /// Transient; nothing was written and the next pass retries.
    FetchFailed(FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Decode => write!(f, "undecodable content"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
