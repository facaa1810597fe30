//! JSON file-backed configuration store.

use super::{ConfigStore, ConfigValue};
use crate::core::{CoreError, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

type Namespaces = HashMap<String, HashMap<String, ConfigValue>>;

/// [`ConfigStore`] persisted as a single JSON document on disk.
///
/// The whole document is loaded at construction; every write rewrites the
/// file atomically (temp file + rename) so a crashed process never leaves a
/// torn config behind.
pub struct FileConfigStore {
    path: PathBuf,
    namespaces: Mutex<Namespaces>,
}

impl FileConfigStore {
    /// Open or create a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let namespaces = if path.exists() {
            let data = fs::read_to_string(&path)
                .map_err(|e| CoreError::IoError(format!("Failed to read config file: {}", e)))?;
            serde_json::from_str(&data)
                .map_err(|e| CoreError::SerializationError(format!("Bad config file: {}", e)))?
        } else {
            Namespaces::new()
        };

        Ok(Self {
            path,
            namespaces: Mutex::new(namespaces),
        })
    }

    fn persist(&self, namespaces: &Namespaces) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CoreError::IoError(format!("Failed to create config directory: {}", e)))?;
        }

        let temp_path = self.path.with_extension("tmp");
        let temp_file = File::create(&temp_path)
            .map_err(|e| CoreError::IoError(format!("Failed to create temp file: {}", e)))?;
        let mut writer = BufWriter::new(temp_file);
        let serialized = serde_json::to_vec_pretty(namespaces)?;
        writer
            .write_all(&serialized)
            .map_err(|e| CoreError::IoError(format!("Failed to write config: {}", e)))?;
        writer
            .flush()
            .map_err(|e| CoreError::IoError(format!("Failed to flush config: {}", e)))?;
        writer
            .get_mut()
            .sync_all()
            .map_err(|e| CoreError::IoError(format!("Failed to sync config: {}", e)))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| CoreError::IoError(format!("Failed to rename config: {}", e)))?;
        Ok(())
    }
}

impl ConfigStore for FileConfigStore {
    fn get(&self, namespace: &str, key: &str) -> Option<ConfigValue> {
        self.namespaces.lock().ok()?.get(namespace)?.get(key).cloned()
    }

    fn set(&self, namespace: &str, key: &str, value: ConfigValue) -> Result<()> {
        let mut namespaces = self.namespaces.lock()?;
        namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.persist(&namespaces)
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let mut namespaces = self.namespaces.lock()?;
        if let Some(ns) = namespaces.get_mut(namespace) {
            ns.remove(key);
            if ns.is_empty() {
                namespaces.remove(namespace);
            }
        }
        self.persist(&namespaces)
    }

    fn load(&self, _namespace: &str) -> Result<()> {
        // The full document is already resident; nothing to prime.
        Ok(())
    }
}
