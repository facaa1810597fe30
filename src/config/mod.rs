//! Key-value configuration store.
//!
//! Everything the bootstrap layer persists — the schema build version, the
//! update claim markers, resolved filesystem paths — goes through the narrow
//! [`ConfigStore`] seam, keyed by `(namespace, key)`. Production deployments
//! back this with the database config table; this crate ships an in-memory
//! store and a JSON file store.

mod file;

pub use file::FileConfigStore;

use crate::core::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

// ============================================================================
// Config Values
// ============================================================================

/// A persisted configuration value.
///
/// The config table stores scalars only. Step claim markers are either an
/// `Int` unix timestamp (claimed) or the `Text` literal `"success"`
/// (completed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Text(String),
}

impl ConfigValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Int(_) => None,
        }
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ============================================================================
// Config Store
// ============================================================================

/// Persistent key-value configuration store, keyed by namespace and key.
///
/// Implementations must be safe to share between threads; this is the sole
/// coordination medium between concurrently bootstrapping processes.
pub trait ConfigStore: Send + Sync {
    /// Read a single value.
    fn get(&self, namespace: &str, key: &str) -> Option<ConfigValue>;

    /// Write a single value.
    fn set(&self, namespace: &str, key: &str, value: ConfigValue) -> Result<()>;

    /// Remove a value. Removing an absent key is not an error.
    fn delete(&self, namespace: &str, key: &str) -> Result<()>;

    /// Prime a whole namespace into any read cache the store keeps.
    /// Stores without a cache may treat this as a no-op.
    fn load(&self, namespace: &str) -> Result<()>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory [`ConfigStore`].
///
/// Backing store for tests and single-process deployments.
///
/// # Examples
///
/// ```
/// use fedibase::config::{ConfigStore, ConfigValue, MemoryConfigStore};
///
/// let store = MemoryConfigStore::new();
/// store.set("system", "build", ConfigValue::Int(1283)).unwrap();
/// assert_eq!(store.get("system", "build").and_then(|v| v.as_i64()), Some(1283));
/// ```
#[derive(Default)]
pub struct MemoryConfigStore {
    entries: Mutex<HashMap<(String, String), ConfigValue>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, across all namespaces.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, namespace: &str, key: &str) -> Option<ConfigValue> {
        self.entries
            .lock()
            .ok()?
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
    }

    fn set(&self, namespace: &str, key: &str, value: ConfigValue) -> Result<()> {
        let mut entries = self.entries.lock()?;
        entries.insert((namespace.to_string(), key.to_string()), value);
        Ok(())
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let mut entries = self.entries.lock()?;
        entries.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    fn load(&self, _namespace: &str) -> Result<()> {
        Ok(())
    }
}
