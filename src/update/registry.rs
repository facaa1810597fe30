//! Registry of per-version migration step handlers.

use crate::config::ConfigStore;
use std::collections::BTreeMap;

/// Outcome of one migration step handler.
pub type StepResult = Result<(), String>;

/// A migration step handler. Receives the config store so data migrations
/// can read and write settings alongside their row-level work.
pub type StepFn = Box<dyn Fn(&dyn ConfigStore) -> StepResult + Send + Sync>;

/// The two phases a schema version can carry work in.
///
/// Pre-update steps run before the structural reconciliation (while the old
/// structure is still in place), update steps after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreUpdate,
    Update,
}

impl Phase {
    /// Prefix of the persisted claim-record key, `<prefix>_<version>`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::PreUpdate => "pre_update",
            Self::Update => "update",
        }
    }
}

/// Explicit ordered mapping from schema version to step handler, one map
/// per phase.
///
/// Most versions register no handler at all: the structural reconciliation
/// covers them and the version counter advances through them as no-ops.
///
/// # Examples
///
/// ```
/// use fedibase::update::{Phase, StepRegistry};
///
/// let mut registry = StepRegistry::new();
/// registry.register_update(1284, |_config| Ok(()));
/// assert!(registry.get(Phase::Update, 1284).is_some());
/// assert!(registry.get(Phase::PreUpdate, 1284).is_none());
/// ```
#[derive(Default)]
pub struct StepRegistry {
    pre_update: BTreeMap<i64, StepFn>,
    update: BTreeMap<i64, StepFn>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pre_update<F>(&mut self, version: i64, handler: F)
    where
        F: Fn(&dyn ConfigStore) -> StepResult + Send + Sync + 'static,
    {
        self.pre_update.insert(version, Box::new(handler));
    }

    pub fn register_update<F>(&mut self, version: i64, handler: F)
    where
        F: Fn(&dyn ConfigStore) -> StepResult + Send + Sync + 'static,
    {
        self.update.insert(version, Box::new(handler));
    }

    pub fn get(&self, phase: Phase, version: i64) -> Option<&StepFn> {
        match phase {
            Phase::PreUpdate => self.pre_update.get(&version),
            Phase::Update => self.update.get(&version),
        }
    }

    /// Registered versions for a phase, in ascending order.
    pub fn versions(&self, phase: Phase) -> Vec<i64> {
        match phase {
            Phase::PreUpdate => self.pre_update.keys().copied().collect(),
            Phase::Update => self.update.keys().copied().collect(),
        }
    }
}
