use std::path::PathBuf;
use std::process::Stdio;

use labwatch_logging::watch_debug;
use tokio::process::Command;

pub const DEFAULT_TEMPLATE: &str = "Update detected for patient {id} at {time}";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Best-effort delivery of a change message. Callers log failures and move on.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target_id: &str, message: &str) -> Result<(), NotifyError>;
}

/// Message body with `{id}` and `{time}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate(String);

impl Default for MessageTemplate {
    fn default() -> Self {
        Self(DEFAULT_TEMPLATE.to_string())
    }
}

impl MessageTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn render(&self, target_id: &str, captured_at: &str) -> String {
        self.0.replace("{id}", target_id).replace("{time}", captured_at)
    }
}

/// Launches `<program> <script> <recipient> <message>` and does not wait for it.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    script: PathBuf,
    recipient: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, script: impl Into<PathBuf>, recipient: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            recipient: recipient.into(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, target_id: &str, message: &str) -> Result<(), NotifyError> {
        let child = Command::new(&self.program)
            .arg(&self.script)
            .arg(&self.recipient)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| NotifyError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        watch_debug!(
            "{}: notifier process {:?} launched",
            target_id,
            child.id()
        );
        // Dropping the handle detaches the child; tokio reaps it in the background.
        drop(child);
        Ok(())
    }
}
