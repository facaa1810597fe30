// ============================================================================
// Fedibase Bootstrap Core
// ============================================================================
//
// Process-bootstrap layer of a federated social-networking node: shared
// constants, the key-value configuration store, path and string plumbing,
// and the schema version sequencer that keeps the database structure in
// step with the running code.

pub mod config;
pub mod core;
pub mod facade;
pub mod schema;
pub mod session;
pub mod update;
pub mod util;
pub mod worker;

// Re-export main types for convenience
pub use crate::config::{ConfigStore, ConfigValue, FileConfigStore, MemoryConfigStore};
pub use crate::core::{CoreError, Result};
pub use crate::facade::App;
pub use crate::schema::{AdminNotifier, SchemaReconciler};
pub use crate::session::Session;
pub use crate::update::{StepRegistry, UpdateError, UpdateRunner, UpdateStatus};
pub use crate::worker::{Priority, WorkerQueue};
