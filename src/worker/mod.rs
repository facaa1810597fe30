//! Background-job enqueue seam.
//!
//! Bootstrapping processes push deferred work (most importantly the `DBUpdate`
//! task) to an external worker dispatcher. Only the enqueue side lives here;
//! execution belongs to the worker daemon.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

// ============================================================================
// Priorities
// ============================================================================

/// Process priority for queued worker tasks.
///
/// The numeric values are stored in the workerqueue table and must not be
/// re-assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Undefined,
    Critical,
    High,
    Medium,
    Low,
    Negligible,
}

impl Priority {
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Undefined => 0,
            Self::Critical => 10,
            Self::High => 20,
            Self::Medium => 30,
            Self::Low => 40,
            Self::Negligible => 50,
        }
    }
}

// ============================================================================
// Worker queue
// ============================================================================

/// Enqueues a named task for the background worker.
///
/// Returns whether the task was accepted. A `false` return is not an error;
/// callers fall back to doing the work in-process where that is safe.
pub trait WorkerQueue: Send + Sync {
    fn add(&self, priority: Priority, task: &str) -> bool;
}

/// A job accepted by [`MemoryWorkerQueue`].
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: Uuid,
    pub priority: Priority,
    pub task: String,
    pub created: DateTime<Utc>,
}

/// In-memory [`WorkerQueue`] holding accepted jobs until a dispatcher
/// drains them.
#[derive(Default)]
pub struct MemoryWorkerQueue {
    jobs: Mutex<Vec<QueuedJob>>,
}

impl MemoryWorkerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the currently queued jobs.
    pub fn jobs(&self) -> Vec<QueuedJob> {
        self.jobs.lock().map(|j| j.clone()).unwrap_or_default()
    }

    /// Remove and return all queued jobs in ascending wire value order:
    /// `Undefined` (0) first, then `Critical` (10) down to `Negligible`
    /// (50), matching how the workerqueue table is polled.
    pub fn drain(&self) -> Vec<QueuedJob> {
        let mut jobs = match self.jobs.lock() {
            Ok(jobs) => jobs,
            Err(_) => return Vec::new(),
        };
        let mut drained: Vec<QueuedJob> = jobs.drain(..).collect();
        drained.sort_by_key(|j| j.priority.as_i32());
        drained
    }
}

impl WorkerQueue for MemoryWorkerQueue {
    fn add(&self, priority: Priority, task: &str) -> bool {
        let mut jobs = match self.jobs.lock() {
            Ok(jobs) => jobs,
            Err(_) => return false,
        };

        // One pending instance per task name is enough; re-adding the same
        // task is accepted but does not duplicate it.
        if jobs.iter().any(|j| j.task == task) {
            return true;
        }

        log::debug!("queueing worker task '{}' at priority {}", task, priority.as_i32());
        jobs.push(QueuedJob {
            id: Uuid::new_v4(),
            priority,
            task: task.to_string(),
            created: Utc::now(),
        });
        true
    }
}

/// [`WorkerQueue`] that refuses every task.
///
/// Stands in for deployments without a worker daemon, forcing callers into
/// their synchronous fallback paths.
#[derive(Default)]
pub struct NullWorkerQueue;

impl WorkerQueue for NullWorkerQueue {
    fn add(&self, _priority: Priority, _task: &str) -> bool {
        false
    }
}
