//! Presentation ports.
//!
//! The workflow and the sync adapter talk to the user only through these
//! two traits. A terminal, a test recorder or any other surface can
//! implement them.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warn,
    Error,
}

/// A user-visible message about the outcome of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub summary: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level,
            summary: summary.into(),
            detail: detail.into(),
            at: Utc::now(),
        }
    }

    pub fn success(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, summary, detail)
    }

    pub fn info(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, summary, detail)
    }

    pub fn warn(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warn, summary, detail)
    }

    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, summary, detail)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.level, NotificationLevel::Error | NotificationLevel::Warn)
    }
}

/// Delivers notifications to the user.
pub trait NotificationPort: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// What the user is being asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
}

impl ConfirmRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Asks the user to accept or decline a mutating action.
pub trait ConfirmationPort: Send + Sync {
    /// Returns true if the user accepted.
    fn confirm(&self, request: &ConfirmRequest) -> bool;
}

/// Notification port that keeps every notification in memory.
///
/// Useful for surfaces that render notifications later, and for tests.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the collected notifications.
    pub fn drain(&self) -> Vec<Notification> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationPort for NotificationLog {
    fn notify(&self, notification: Notification) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

/// Confirmation port with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl ConfirmationPort for FixedAnswer {
    fn confirm(&self, _request: &ConfirmRequest) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_log_drains() {
        let log = NotificationLog::new();
        log.notify(Notification::success("Saved", "Port 80 added"));
        log.notify(Notification::error("Failed", "boom"));
        assert_eq!(log.len(), 2);

        let drained = log.drain();
        assert_eq!(drained[0].level, NotificationLevel::Success);
        assert!(drained[1].is_failure());
        assert!(log.is_empty());
    }

    #[test]
    fn test_fixed_answer() {
        let request = ConfirmRequest::new("Delete", "Delete port 80?");
        assert!(FixedAnswer(true).confirm(&request));
        assert!(!FixedAnswer(false).confirm(&request));
    }
}
