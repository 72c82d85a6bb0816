//! RON configuration for the monitor and history commands.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use labwatch_engine::{
    FetchSettings, NormalizeError, TargetError, TargetRegistry, TextNormalizer,
    DEFAULT_CONTENT_SELECTOR, DEFAULT_TEMPLATE,
};
use labwatch_logging::watch_warn;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG: &str = "labwatch.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error("no patient ids configured")]
    NoTargets,
    #[error("unknown time zone {0:?}")]
    UnknownTimeZone(String),
    #[error(transparent)]
    Selector(#[from] NormalizeError),
    #[error("check_every_sec must be greater than zero")]
    ZeroInterval,
}

/// On-disk shape of `labwatch.ron`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: String,
    #[serde(default)]
    patient_ids: Vec<String>,
    #[serde(default)]
    patient_list_file: Option<PathBuf>,
    #[serde(default = "default_check_every_sec")]
    check_every_sec: u64,
    #[serde(default = "default_timezone")]
    timezone: String,
    #[serde(default = "default_archive_dir")]
    archive_dir: PathBuf,
    #[serde(default = "default_content_selector")]
    content_selector: String,
    #[serde(default)]
    fetch: FetchSection,
    #[serde(default)]
    notifier: NotifierSection,
}

fn default_check_every_sec() -> u64 {
    600
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("patient")
}

fn default_content_selector() -> String {
    DEFAULT_CONTENT_SELECTOR.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FetchSection {
    connect_timeout_sec: u64,
    request_timeout_sec: u64,
    redirect_limit: usize,
    max_bytes: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        let defaults = FetchSettings::default();
        Self {
            connect_timeout_sec: defaults.connect_timeout.as_secs(),
            request_timeout_sec: defaults.request_timeout.as_secs(),
            redirect_limit: defaults.redirect_limit,
            max_bytes: defaults.max_bytes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NotifierSection {
    enabled: bool,
    program: String,
    script: PathBuf,
    recipient: Option<String>,
    template: String,
}

impl Default for NotifierSection {
    fn default() -> Self {
        Self {
            enabled: false,
            program: "node".to_string(),
            script: PathBuf::from("notifier/send_whatsapp.js"),
            recipient: None,
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// External command notification, present only when enabled with a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierSettings {
    pub program: String,
    pub script: PathBuf,
    pub recipient: String,
    pub template: String,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub registry: TargetRegistry,
    pub interval: Duration,
    pub timezone: Tz,
    pub archive_dir: PathBuf,
    pub normalizer: TextNormalizer,
    pub fetch: FetchSettings,
    pub notifier: Option<NotifierSettings>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_ron(&text, path, base_dir)
    }

    /// `origin` names the source in errors; `base_dir` anchors `patient_list_file`.
    pub fn from_ron(text: &str, origin: &Path, base_dir: &Path) -> Result<Self, ConfigError> {
        let file: FileConfig = ron::from_str(text).map_err(|err| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: err.to_string(),
        })?;

        let mut ids = file.patient_ids;
        if let Some(list) = &file.patient_list_file {
            ids.extend(read_patient_list(&base_dir.join(list))?);
        }
        if ids.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        let registry = TargetRegistry::from_template(&file.base_url, ids)?;

        if file.check_every_sec == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        let timezone = file
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimeZone(file.timezone.clone()))?;
        let normalizer = TextNormalizer::new(&file.content_selector)?;

        let fetch = FetchSettings {
            connect_timeout: Duration::from_secs(file.fetch.connect_timeout_sec),
            request_timeout: Duration::from_secs(file.fetch.request_timeout_sec),
            redirect_limit: file.fetch.redirect_limit,
            max_bytes: file.fetch.max_bytes,
            ..FetchSettings::default()
        };

        Ok(Self {
            registry,
            interval: Duration::from_secs(file.check_every_sec),
            timezone,
            archive_dir: file.archive_dir,
            normalizer,
            fetch,
            notifier: notifier_settings(file.notifier),
        })
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Either a RON list of ids or plain text with one id per line.
fn read_patient_list(path: &Path) -> Result<Vec<String>, ConfigError> {
    let text = read(path)?;
    if path.extension().is_some_and(|ext| ext == "ron") {
        return ron::from_str(&text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        });
    }
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn notifier_settings(section: NotifierSection) -> Option<NotifierSettings> {
    if !section.enabled {
        return None;
    }
    let Some(recipient) = section.recipient.filter(|r| !r.trim().is_empty()) else {
        watch_warn!("notifier enabled without a recipient; notifications are disabled");
        return None;
    };
    Some(NotifierSettings {
        program: section.program,
        script: section.script,
        recipient,
        template: section.template,
    })
}
