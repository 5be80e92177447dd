use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
    time::SystemTime,
};

use serde::{Deserialize, Serialize};

/// Severity attached to each notice. The display decides how to color them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    Highlight,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Highlight => "highlight",
        };
        f.write_str(name)
    }
}

/// A single timestamped entry on the log channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub at: SystemTime,
    pub message: String,
    pub severity: Severity,
}

/// Append-only notice stream shared by the host, the dispatcher and every
/// module. Cloning yields another handle onto the same stream.
#[derive(Clone, Default)]
pub struct NoticeLog {
    entries: Arc<Mutex<Vec<Notice>>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a notice and mirrors it to `tracing`.
    pub fn add(&self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        match severity {
            Severity::Error => tracing::error!(target: "dsa_arcade::notice", "{message}"),
            Severity::Warning => tracing::warn!(target: "dsa_arcade::notice", "{message}"),
            _ => tracing::info!(target: "dsa_arcade::notice", %severity, "{message}"),
        }

        self.lock().push(Notice {
            at: SystemTime::now(),
            message,
            severity,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.add(message, Severity::Info);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.add(message, Severity::Success);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.add(message, Severity::Warning);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.add(message, Severity::Error);
    }

    pub fn highlight(&self, message: impl Into<String>) {
        self.add(message, Severity::Highlight);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Copies the current contents of the stream.
    pub fn snapshot(&self) -> Vec<Notice> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns `true` if any notice of the given severity contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.lock()
            .iter()
            .any(|notice| notice.severity == severity && notice.message.contains(needle))
    }

    // Notices are diagnostics; a poisoned stream keeps its data rather than
    // turning every log call into a fallible operation.
    fn lock(&self) -> MutexGuard<'_, Vec<Notice>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for NoticeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoticeLog")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_stream() {
        let log = NoticeLog::new();
        let other = log.clone();

        log.info("first");
        other.warning("second");

        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].severity, Severity::Warning);
        assert!(log.contains(Severity::Info, "first"));
        assert!(!log.contains(Severity::Error, "first"));
    }

    #[test]
    fn clear_empties_the_stream() {
        let log = NoticeLog::new();
        log.error("boom");
        log.clear();
        assert!(log.is_empty());
    }
}
