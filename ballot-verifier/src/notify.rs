//! Notification sink shared by the session flows and the polling tasks

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    /// Ordinary operational failure.
    Error,
    /// The ledger itself may be compromised (divergence, tampering).
    Alert,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.severity, self.message)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    fn info(&self, message: &str) {
        self.notify(Notice::new(Severity::Info, message));
    }

    fn success(&self, message: &str) {
        self.notify(Notice::new(Severity::Success, message));
    }

    fn error(&self, message: &str) {
        self.notify(Notice::new(Severity::Error, message));
    }

    fn alert(&self, message: &str) {
        self.notify(Notice::new(Severity::Alert, message));
    }
}

/// Emits notices as log events. Alerts go to the `ledger_alert` target at
/// error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info | Severity::Success => info!("{}", notice.message),
            Severity::Error => warn!("{}", notice.message),
            Severity::Alert => error!(target: "ledger_alert", "{}", notice.message),
        }
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|n| n.severity == severity)
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
