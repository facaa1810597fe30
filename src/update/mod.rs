//! Schema Version Sequencer.
//!
//! Walks the persisted schema build version (`system.build`) up to
//! [`DB_UPDATE_VERSION`](crate::core::constants::DB_UPDATE_VERSION) by
//! running registered pre-update and update steps in strictly increasing
//! version order, with per-step claim records in the `database` config
//! namespace so that processes racing at bootstrap do not double-apply a
//! step.
//!
//! There is no lock manager. The config store is the sole coordination
//! medium: a step record holding a timestamp means "claimed", the literal
//! `"success"` means "done". The claim is check-then-write and not atomic;
//! two processes racing between the check and the write can both claim a
//! step. That window is accepted.

mod registry;

pub use registry::{Phase, StepFn, StepRegistry, StepResult};

use crate::config::{ConfigStore, ConfigValue};
use crate::core::constants::{DB_UPDATE_VERSION, MIN_UPDATE_VERSION};
use crate::core::CoreError;
use crate::schema::{AdminNotifier, SchemaReconciler};
use crate::worker::{Priority, WorkerQueue};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{event, info_span, Level};

/// Worker task name for the asynchronous schema update.
pub const DB_UPDATE_TASK: &str = "DBUpdate";

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum UpdateError {
    /// The installed schema predates the supported upgrade window. The
    /// caller must terminate: no step may run against such a database.
    #[error(
        "You try to update from a version prior to database version {minimum}. \
         The direct upgrade path is not supported. Please update to an \
         intermediate release first. (installed: {found})"
    )]
    UnsupportedVersion { found: i64, minimum: i64 },

    /// Another process already claimed or completed the step. A normal
    /// halt, never surfaced to end users.
    #[error("Step {phase}_{version} is already claimed by another process")]
    StepClaimConflict { version: i64, phase: &'static str },

    /// A step handler ran and reported failure. Admins were notified; the
    /// build version stays at the last successful step.
    #[error("Step {phase}_{version} failed")]
    StepFailed { version: i64, phase: &'static str },

    /// The structural schema reconciliation failed. Admins were notified
    /// with the detail; the whole sequence was aborted.
    #[error("Structural update to version {version} failed: {detail}")]
    StructuralFailed { version: i64, detail: String },

    #[error(transparent)]
    Config(#[from] CoreError),
}

/// What `ensure_current` did with an outdated (or current) schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Schema already at the target version.
    Current,
    /// Update handed to the background worker.
    Enqueued,
    /// Update ran synchronously to completion in this process.
    Applied,
    /// Update could neither be enqueued nor run here; the next bootstrap
    /// will try again.
    Deferred,
}

// ============================================================================
// Update Runner
// ============================================================================

/// Drives the versioned schema update sequence.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use fedibase::config::MemoryConfigStore;
/// use fedibase::schema::{LogNotifier, StaticReconciler};
/// use fedibase::update::{StepRegistry, UpdateRunner, UpdateStatus};
/// use fedibase::worker::MemoryWorkerQueue;
///
/// let runner = UpdateRunner::new(
///     Arc::new(MemoryConfigStore::new()),
///     Arc::new(StaticReconciler::succeeding()),
///     Arc::new(LogNotifier),
///     Arc::new(MemoryWorkerQueue::new()),
/// );
///
/// // Fresh install: build initialized to target - 1, update enqueued.
/// let status = runner.ensure_current(false).unwrap();
/// assert_eq!(status, UpdateStatus::Enqueued);
/// ```
pub struct UpdateRunner {
    config: Arc<dyn ConfigStore>,
    schema: Arc<dyn SchemaReconciler>,
    notifier: Arc<dyn AdminNotifier>,
    worker: Arc<dyn WorkerQueue>,
    registry: StepRegistry,
    target_version: i64,
    min_version: i64,
}

impl UpdateRunner {
    /// Create a runner targeting the built-in
    /// [`DB_UPDATE_VERSION`](crate::core::constants::DB_UPDATE_VERSION).
    pub fn new(
        config: Arc<dyn ConfigStore>,
        schema: Arc<dyn SchemaReconciler>,
        notifier: Arc<dyn AdminNotifier>,
        worker: Arc<dyn WorkerQueue>,
    ) -> Self {
        Self {
            config,
            schema,
            notifier,
            worker,
            registry: StepRegistry::new(),
            target_version: DB_UPDATE_VERSION,
            min_version: MIN_UPDATE_VERSION,
        }
    }

    /// Attach the step registry.
    pub fn with_registry(mut self, registry: StepRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Override the target version.
    pub fn target_version(mut self, version: i64) -> Self {
        self.target_version = version;
        self
    }

    /// Override the minimum supported version.
    pub fn min_version(mut self, version: i64) -> Self {
        self.min_version = version;
        self
    }

    fn build_version(&self) -> Option<i64> {
        // A stored 0 counts as unset, like an absent row.
        self.config
            .get("system", "build")
            .and_then(|v| v.as_i64())
            .filter(|b| *b != 0)
    }

    fn set_build_version(&self, version: i64) -> Result<(), UpdateError> {
        self.config
            .set("system", "build", ConfigValue::Int(version))?;
        Ok(())
    }

    /// Bring the schema up to date, invoked once at process bootstrap.
    ///
    /// Reads `system.build`, initializing a fresh install to one below the
    /// target (the install itself creates the current structure). An
    /// outdated schema is handed to the background worker as a
    /// critical-priority [`DB_UPDATE_TASK`]; when enqueueing fails and this
    /// process *is* the worker (`via_worker`), the update runs
    /// synchronously instead — the worker cannot re-enqueue itself and
    /// wait.
    ///
    /// # Errors
    ///
    /// [`UpdateError::UnsupportedVersion`] is fatal: the caller terminates
    /// with the message, nothing has been touched. Errors out of the
    /// synchronous fallback are those of [`run`](Self::run).
    pub fn ensure_current(&self, via_worker: bool) -> Result<UpdateStatus, UpdateError> {
        let build = match self.build_version() {
            Some(build) => build,
            None => {
                let assumed = self.target_version - 1;
                self.set_build_version(assumed)?;
                assumed
            }
        };

        // Upgrades from before the minimum have no direct path anymore.
        if build < self.min_version {
            return Err(UpdateError::UnsupportedVersion {
                found: build,
                minimum: self.min_version,
            });
        }

        if build < self.target_version {
            if self.worker.add(Priority::Critical, DB_UPDATE_TASK) {
                return Ok(UpdateStatus::Enqueued);
            }
            // No worker available. If we are the worker, do it ourselves.
            if via_worker {
                self.run()?;
                return Ok(UpdateStatus::Applied);
            }
            return Ok(UpdateStatus::Deferred);
        }

        Ok(UpdateStatus::Current)
    }

    /// The migration driver.
    ///
    /// Re-reads the build version, normalizes it (unset or above target is
    /// clamped to target − 1), and, unless someone already finished this
    /// exact structural migration, runs: pre-update steps in order, the
    /// structural reconciliation, then update steps in order. A failed
    /// pre-update aborts the invocation before the structural apply, so no
    /// update step of that or a later version runs. Completed work is never
    /// rolled back; the next invocation resumes from the persisted version.
    pub fn run(&self) -> Result<(), UpdateError> {
        let span = info_span!("db_update", target = self.target_version);
        let _guard = span.enter();

        let stored = match self.build_version() {
            Some(build) if build <= self.target_version => build,
            _ => {
                let clamped = self.target_version - 1;
                self.set_build_version(clamped)?;
                clamped
            }
        };

        if stored == self.target_version {
            return Ok(());
        }

        event!(Level::INFO, stored, "database update required");
        self.config.load("database")?;

        // Somebody may already have finished this exact structural
        // migration.
        let compare_key = format!("dbupdate_{}", self.target_version);
        if self.config.get("database", &compare_key).is_some() {
            return Ok(());
        }

        for version in (stored + 1)..=self.target_version {
            self.run_step(version, Phase::PreUpdate)?;
        }

        // Claim the structural update before running it.
        self.config.set(
            "database",
            &compare_key,
            ConfigValue::Int(Utc::now().timestamp()),
        )?;

        if let Err(detail) = self.schema.apply_structure(false) {
            self.notifier.notify_admins(
                &format!("Database structure update {} failed", self.target_version),
                &detail,
            );
            return Err(UpdateError::StructuralFailed {
                version: self.target_version,
                detail,
            });
        }

        self.config
            .set("database", &compare_key, "success".into())?;

        for version in (stored + 1)..=self.target_version {
            self.run_step(version, Phase::Update)?;
        }

        event!(Level::INFO, version = self.target_version, "database update finished");
        Ok(())
    }

    /// Run a single step of one phase.
    ///
    /// A version without a registered handler is trivially successful: the
    /// step record is marked `"success"` and, for the update phase, the
    /// build version advances — versions are never skipped silently, they
    /// advance as deliberate no-ops.
    ///
    /// For a registered handler, an existing step record means another
    /// process claimed or finished it; this invocation halts. Otherwise the
    /// step is claimed with a timestamp and the handler runs. If the update
    /// fails or times out completely, the step record has to be deleted
    /// manually to try again.
    fn run_step(&self, version: i64, phase: Phase) -> Result<(), UpdateError> {
        let name = format!("{}_{}", phase.prefix(), version);

        let handler = match self.registry.get(phase, version) {
            Some(handler) => handler,
            None => {
                self.config.set("database", &name, "success".into())?;
                if phase == Phase::Update {
                    self.set_build_version(version)?;
                }
                return Ok(());
            }
        };

        // There could be a lot of processes running or about to run; exactly
        // one of them may execute this step. Check for an existing claim,
        // then take responsibility.
        if self.config.get("database", &name).is_some() {
            return Err(UpdateError::StepClaimConflict {
                version,
                phase: phase.prefix(),
            });
        }
        self.config.set(
            "database",
            &name,
            ConfigValue::Int(Utc::now().timestamp()),
        )?;

        event!(Level::DEBUG, step = %name, "running update step");
        if let Err(reason) = handler(self.config.as_ref()) {
            event!(Level::WARN, step = %name, %reason, "update step failed");
            self.notifier.notify_admins(
                &format!("Update {} failed", version),
                &format!("Update {} failed. See error logs.", version),
            );
            return Err(UpdateError::StepFailed {
                version,
                phase: phase.prefix(),
            });
        }

        self.config.set("database", &name, "success".into())?;
        if phase == Phase::Update {
            self.set_build_version(version)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;
    use crate::schema::{RecordingNotifier, StaticReconciler};
    use crate::worker::{MemoryWorkerQueue, NullWorkerQueue};

    fn runner_with(
        config: Arc<MemoryConfigStore>,
        notifier: Arc<RecordingNotifier>,
        registry: StepRegistry,
    ) -> UpdateRunner {
        UpdateRunner::new(
            config,
            Arc::new(StaticReconciler::succeeding()),
            notifier,
            Arc::new(NullWorkerQueue),
        )
        .with_registry(registry)
        .target_version(1284)
        .min_version(1170)
    }

    #[test]
    fn test_fresh_install_initializes_build() {
        let config = Arc::new(MemoryConfigStore::new());
        let runner = runner_with(config.clone(), Arc::new(RecordingNotifier::new()), StepRegistry::new());

        // Null worker, not via worker: initialized but deferred.
        let status = runner.ensure_current(false).unwrap();
        assert_eq!(status, UpdateStatus::Deferred);
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1283)
        );
    }

    #[test]
    fn test_enqueue_preferred_over_sync_run() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1283)).unwrap();
        let queue = Arc::new(MemoryWorkerQueue::new());
        let runner = UpdateRunner::new(
            config.clone(),
            Arc::new(StaticReconciler::succeeding()),
            Arc::new(RecordingNotifier::new()),
            queue.clone(),
        )
        .target_version(1284)
        .min_version(1170);

        let status = runner.ensure_current(true).unwrap();
        assert_eq!(status, UpdateStatus::Enqueued);
        assert_eq!(queue.jobs().len(), 1);
        assert_eq!(queue.jobs()[0].task, DB_UPDATE_TASK);
        // Nothing ran synchronously.
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1283)
        );
    }

    #[test]
    fn test_worker_fallback_runs_synchronously() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1283)).unwrap();
        let runner = runner_with(config.clone(), Arc::new(RecordingNotifier::new()), StepRegistry::new());

        let status = runner.ensure_current(true).unwrap();
        assert_eq!(status, UpdateStatus::Applied);
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1284)
        );
    }

    #[test]
    fn test_too_old_version_is_fatal_before_any_step() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1100)).unwrap();
        let mut registry = StepRegistry::new();
        registry.register_update(1284, |config| {
            config.set("system", "ran", "yes".into()).map_err(|e| e.to_string())
        });
        let notifier = Arc::new(RecordingNotifier::new());
        let runner = runner_with(config.clone(), notifier.clone(), registry);

        let err = runner.ensure_current(true).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::UnsupportedVersion { found: 1100, minimum: 1170 }
        ));
        assert_eq!(config.get("system", "ran"), None);
        assert_eq!(notifier.count(), 0);
        // Build untouched.
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1100)
        );
    }

    #[test]
    fn test_run_is_noop_when_current() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1284)).unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let runner = runner_with(config.clone(), notifier.clone(), StepRegistry::new());

        runner.run().unwrap();
        assert_eq!(notifier.count(), 0);
        assert_eq!(config.len(), 1); // no markers written
    }

    #[test]
    fn test_run_clamps_future_build() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(2000)).unwrap();
        let runner = runner_with(config.clone(), Arc::new(RecordingNotifier::new()), StepRegistry::new());

        runner.run().unwrap();
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1284)
        );
    }

    #[test]
    fn test_comparison_marker_short_circuits() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1283)).unwrap();
        config
            .set("database", "dbupdate_1284", "success".into())
            .unwrap();
        let mut registry = StepRegistry::new();
        registry.register_update(1284, |config| {
            config.set("system", "ran", "yes".into()).map_err(|e| e.to_string())
        });
        let runner = runner_with(config.clone(), Arc::new(RecordingNotifier::new()), registry);

        runner.run().unwrap();
        assert_eq!(config.get("system", "ran"), None);
    }

    #[test]
    fn test_undefined_steps_advance_without_notification() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1280)).unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let runner = runner_with(config.clone(), notifier.clone(), StepRegistry::new());

        runner.run().unwrap();
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1284)
        );
        assert_eq!(notifier.count(), 0);
        for v in 1281..=1284 {
            assert_eq!(
                config
                    .get("database", &format!("update_{}", v))
                    .and_then(|val| val.as_str().map(String::from)),
                Some("success".to_string())
            );
        }
    }

    #[test]
    fn test_successful_update_step_records_success() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1283)).unwrap();
        let mut registry = StepRegistry::new();
        registry.register_update(1284, |_| Ok(()));
        let notifier = Arc::new(RecordingNotifier::new());
        let runner = runner_with(config.clone(), notifier.clone(), registry);

        runner.run().unwrap();
        assert_eq!(
            config
                .get("database", "update_1284")
                .and_then(|v| v.as_str().map(String::from)),
            Some("success".to_string())
        );
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1284)
        );
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_failed_update_step_keeps_version_and_notifies() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1283)).unwrap();
        let mut registry = StepRegistry::new();
        registry.register_update(1284, |_| Err("column rename failed".to_string()));
        let notifier = Arc::new(RecordingNotifier::new());
        let runner = runner_with(config.clone(), notifier.clone(), registry);

        let err = runner.run().unwrap_err();
        assert!(matches!(err, UpdateError::StepFailed { version: 1284, .. }));
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1283)
        );
        assert_eq!(notifier.count(), 1);
        assert!(notifier.sent()[0].0.contains("1284"));
        // Claim stays behind as a timestamp so the step is not retried blindly.
        assert!(config.get("database", "update_1284").is_some());
    }

    #[test]
    fn test_failed_pre_update_blocks_everything_later() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1282)).unwrap();
        let mut registry = StepRegistry::new();
        registry.register_pre_update(1283, |_| Err("prep failed".to_string()));
        registry.register_update(1283, |config| {
            config.set("system", "ran", "yes".into()).map_err(|e| e.to_string())
        });
        let notifier = Arc::new(RecordingNotifier::new());
        let runner = runner_with(config.clone(), notifier.clone(), registry);

        let err = runner.run().unwrap_err();
        assert!(matches!(
            err,
            UpdateError::StepFailed { version: 1283, phase: "pre_update" }
        ));
        // No update step ran, no structural claim was written, the build
        // version stayed below the failing step.
        assert_eq!(config.get("system", "ran"), None);
        assert_eq!(config.get("database", "dbupdate_1284"), None);
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1282)
        );
    }

    #[test]
    fn test_claimed_step_halts_without_notification() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1283)).unwrap();
        // Another process claimed the step moments ago.
        config
            .set("database", "update_1284", ConfigValue::Int(1_700_000_000))
            .unwrap();
        let mut registry = StepRegistry::new();
        registry.register_update(1284, |_| Ok(()));
        let notifier = Arc::new(RecordingNotifier::new());
        let runner = runner_with(config.clone(), notifier.clone(), registry);

        let err = runner.run().unwrap_err();
        assert!(matches!(
            err,
            UpdateError::StepClaimConflict { version: 1284, .. }
        ));
        assert_eq!(notifier.count(), 0);
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1283)
        );
    }

    #[test]
    fn test_structural_failure_aborts_and_notifies() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1283)).unwrap();
        let mut registry = StepRegistry::new();
        registry.register_update(1284, |config| {
            config.set("system", "ran", "yes".into()).map_err(|e| e.to_string())
        });
        let notifier = Arc::new(RecordingNotifier::new());
        let runner = UpdateRunner::new(
            config.clone(),
            Arc::new(StaticReconciler::failing("ALTER TABLE item failed")),
            notifier.clone(),
            Arc::new(NullWorkerQueue),
        )
        .with_registry(registry)
        .target_version(1284)
        .min_version(1170);

        let err = runner.run().unwrap_err();
        assert!(matches!(err, UpdateError::StructuralFailed { version: 1284, .. }));
        // The comparison marker stays a timestamp, never "success".
        let marker = config.get("database", "dbupdate_1284").unwrap();
        assert_ne!(marker.as_str(), Some("success"));
        // No update step ran, build unchanged, one notification with detail.
        assert_eq!(config.get("system", "ran"), None);
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1283)
        );
        assert_eq!(notifier.count(), 1);
        assert!(notifier.sent()[0].1.contains("ALTER TABLE item failed"));
    }

    #[test]
    fn test_rerun_resumes_from_persisted_version() {
        let config = Arc::new(MemoryConfigStore::new());
        config.set("system", "build", ConfigValue::Int(1282)).unwrap();
        let mut registry = StepRegistry::new();
        registry.register_update(1283, |_| Err("transient".to_string()));
        let runner = runner_with(config.clone(), Arc::new(RecordingNotifier::new()), registry);

        runner.run().unwrap_err();
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1282)
        );

        // Operator clears the failed claim, next invocation resumes.
        config.delete("database", "update_1283").unwrap();
        config.delete("database", "dbupdate_1284").unwrap();
        let mut registry = StepRegistry::new();
        registry.register_update(1283, |_| Ok(()));
        let runner = runner_with(config.clone(), Arc::new(RecordingNotifier::new()), registry);
        runner.run().unwrap();
        assert_eq!(
            config.get("system", "build").and_then(|v| v.as_i64()),
            Some(1284)
        );
    }
}
