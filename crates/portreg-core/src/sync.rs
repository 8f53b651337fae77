//! Bookkeeping for bulk imports and their forwarding to a backend.
//!
//! Pure types, decoupled from the store and from I/O, so the aggregation
//! rules can be tested on their own.

use crate::models::{PortId, PortRecord};
use crate::ports::Notification;

/// Outcome of forwarding a single imported record to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Backend accepted the record under its local id
    Confirmed,
    /// Backend accepted the record and assigned a different id
    Rekeyed,
    /// Backend rejected the record or could not be reached
    Failed,
}

/// Counters for one forwarding pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ForwardStats {
    pub confirmed: usize,
    pub rekeyed: usize,
    pub failed: usize,
}

impl ForwardStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome, incrementing the appropriate counter.
    pub fn record(&mut self, outcome: ForwardOutcome) {
        match outcome {
            ForwardOutcome::Confirmed => self.confirmed += 1,
            ForwardOutcome::Rekeyed => self.rekeyed += 1,
            ForwardOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.confirmed + self.rekeyed + self.failed
    }

    pub fn successful(&self) -> usize {
        self.confirmed + self.rekeyed
    }
}

/// A record the backend did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardFailure {
    pub id: PortId,
    pub port_number: String,
    pub error: String,
}

/// Result of one bulk import.
///
/// `merged` always lists every record that entered the local collection,
/// whatever happened to the forwarding.
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub merged: Vec<PortRecord>,
    /// None when no backend is attached
    pub forward: Option<ForwardStats>,
    pub failures: Vec<ForwardFailure>,
}

/// At most this many failures are spelled out in a summary notification.
const LISTED_FAILURES: usize = 5;

impl ImportSummary {
    /// Summary for an import that stayed local.
    pub fn local(merged: Vec<PortRecord>) -> Self {
        Self {
            merged,
            forward: None,
            failures: Vec::new(),
        }
    }

    /// Summary for an import whose records were forwarded.
    pub fn forwarded(merged: Vec<PortRecord>) -> Self {
        Self {
            merged,
            forward: Some(ForwardStats::new()),
            failures: Vec::new(),
        }
    }

    /// Records a forwarding outcome. Ignored for local summaries.
    pub fn record(&mut self, outcome: ForwardOutcome) {
        if let Some(stats) = self.forward.as_mut() {
            stats.record(outcome);
        }
    }

    /// Records a failed forward with its reason.
    pub fn record_failure(&mut self, failure: ForwardFailure) {
        self.record(ForwardOutcome::Failed);
        self.failures.push(failure);
    }

    pub fn merged_count(&self) -> usize {
        self.merged.len()
    }

    pub fn failed_count(&self) -> usize {
        self.forward.as_ref().map_or(0, |s| s.failed)
    }

    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }

    /// The single notification that reports this import.
    pub fn notification(&self) -> Notification {
        let merged = self.merged_count();
        let Some(stats) = &self.forward else {
            return Notification::success("Import complete", format!("{} records imported.", merged));
        };

        if self.is_clean() {
            return Notification::success(
                "Import complete",
                format!("{} records imported and saved to the backend.", merged),
            );
        }

        let mut detail = format!(
            "{} records imported locally; {} saved to the backend, {} failed.",
            merged,
            stats.successful(),
            stats.failed
        );
        for failure in self.failures.iter().take(LISTED_FAILURES) {
            let port = if failure.port_number.is_empty() {
                "(blank)"
            } else {
                failure.port_number.as_str()
            };
            detail.push_str(&format!("\n  - #{} port {}: {}", failure.id, port, failure.error));
        }
        if self.failures.len() > LISTED_FAILURES {
            detail.push_str(&format!(
                "\n  ... and {} more",
                self.failures.len() - LISTED_FAILURES
            ));
        }
        Notification::warn("Import partially saved", detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPortRecord;
    use crate::ports::NotificationLevel;

    fn merged(n: u64) -> Vec<PortRecord> {
        (1..=n)
            .map(|id| NewPortRecord::new(format!("{}", 7000 + id), "P", "A", "").with_id(id))
            .collect()
    }

    #[test]
    fn test_forward_stats_record() {
        let mut stats = ForwardStats::new();
        stats.record(ForwardOutcome::Confirmed);
        stats.record(ForwardOutcome::Rekeyed);
        stats.record(ForwardOutcome::Failed);
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.successful(), 2);
    }

    #[test]
    fn test_local_summary_ignores_forward_outcomes() {
        let mut summary = ImportSummary::local(merged(2));
        summary.record(ForwardOutcome::Failed);
        assert!(summary.is_clean());
        assert_eq!(summary.failed_count(), 0);
        let note = summary.notification();
        assert_eq!(note.level, NotificationLevel::Success);
        assert_eq!(note.detail, "2 records imported.");
    }

    #[test]
    fn test_clean_forwarded_summary() {
        let mut summary = ImportSummary::forwarded(merged(2));
        summary.record(ForwardOutcome::Confirmed);
        summary.record(ForwardOutcome::Confirmed);
        let note = summary.notification();
        assert_eq!(note.level, NotificationLevel::Success);
        assert!(note.detail.contains("saved to the backend"));
    }

    #[test]
    fn test_failures_are_aggregated_into_one_notification() {
        let mut summary = ImportSummary::forwarded(merged(8));
        summary.record(ForwardOutcome::Confirmed);
        for id in 2..=8 {
            summary.record_failure(ForwardFailure {
                id,
                port_number: if id == 2 { String::new() } else { id.to_string() },
                error: "HTTP 500".to_string(),
            });
        }

        assert_eq!(summary.failed_count(), 7);
        assert_eq!(summary.merged_count(), 8);

        let note = summary.notification();
        assert_eq!(note.level, NotificationLevel::Warn);
        assert!(note.detail.starts_with("8 records imported locally; 1 saved to the backend, 7 failed."));
        assert!(note.detail.contains("#2 port (blank): HTTP 500"));
        assert!(note.detail.contains("... and 2 more"));
    }
}
