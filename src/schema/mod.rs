//! Collaborator seams of the schema updater: structural reconciliation and
//! administrator notification.
//!
//! The updater never talks to the database layer directly. It drives a
//! [`SchemaReconciler`] that diffs the expected table/column definitions
//! against the live database, and reports failures through an
//! [`AdminNotifier`].

use std::sync::Mutex;

/// Reconciles the full target schema against the live database.
///
/// The call is treated as atomic by the updater: either the structure ends
/// up matching the target definitions, or an error description comes back
/// and nothing further runs.
pub trait SchemaReconciler: Send + Sync {
    /// Apply the target structural schema in one operation.
    ///
    /// `verbose` controls whether per-statement progress is emitted;
    /// bootstrap runs suppress it.
    fn apply_structure(&self, verbose: bool) -> Result<(), String>;
}

/// Sends out-of-band failure reports to the node administrators.
pub trait AdminNotifier: Send + Sync {
    fn notify_admins(&self, subject: &str, body: &str);
}

// ============================================================================
// Notifier implementations
// ============================================================================

/// [`AdminNotifier`] that writes to the error log.
///
/// The default for deployments without a configured mail transport.
#[derive(Default)]
pub struct LogNotifier;

impl AdminNotifier for LogNotifier {
    fn notify_admins(&self, subject: &str, body: &str) {
        log::error!("admin notification: {}: {}", subject, body);
    }
}

/// [`AdminNotifier`] that records every notification, for tests.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl AdminNotifier for RecordingNotifier {
    fn notify_admins(&self, subject: &str, body: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((subject.to_string(), body.to_string()));
        }
    }
}

// ============================================================================
// Reconciler implementations
// ============================================================================

/// [`SchemaReconciler`] with a fixed outcome, for tests and dry runs.
pub struct StaticReconciler {
    outcome: Result<(), String>,
}

impl StaticReconciler {
    pub fn succeeding() -> Self {
        Self { outcome: Ok(()) }
    }

    pub fn failing(detail: &str) -> Self {
        Self {
            outcome: Err(detail.to_string()),
        }
    }
}

impl SchemaReconciler for StaticReconciler {
    fn apply_structure(&self, _verbose: bool) -> Result<(), String> {
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_captures_messages() {
        let notifier = RecordingNotifier::new();
        notifier.notify_admins("Update failed", "see logs");

        assert_eq!(notifier.count(), 1);
        assert_eq!(notifier.sent()[0].0, "Update failed");
    }

    #[test]
    fn test_static_reconciler_outcomes() {
        assert!(StaticReconciler::succeeding().apply_structure(false).is_ok());
        let err = StaticReconciler::failing("ALTER TABLE item failed")
            .apply_structure(false)
            .unwrap_err();
        assert_eq!(err, "ALTER TABLE item failed");
    }
}
