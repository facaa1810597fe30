//! Filesystem path bookkeeping: temp, item-cache and spool directories.
//!
//! Resolution order is always: a configured path if it is usable, otherwise
//! a directory of our own under the system temp path, persisted back to the
//! config store once it proved writable.

use crate::config::ConfigStore;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default item cache lifetime when none is configured.
const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(86_400);

/// Check if a directory exists and is really usable: writable by us, not
/// just present.
pub fn directory_usable<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if path.as_os_str().is_empty() || !path.is_dir() {
        return false;
    }
    // A write probe beats inspecting permission bits across platforms.
    tempfile::Builder::new()
        .prefix(".probe")
        .tempfile_in(path)
        .is_ok()
}

fn configured_path(config: &dyn ConfigStore, key: &str) -> Option<PathBuf> {
    let configured = config
        .get("system", key)
        .and_then(|v| v.as_str().map(PathBuf::from))?;
    if directory_usable(&configured) {
        // Always store the real path, not the path through symlinks.
        return configured.canonicalize().ok().or(Some(configured));
    }
    None
}

fn store_path(config: &dyn ConfigStore, key: &str, path: &Path) {
    let value = path.to_string_lossy().to_string();
    if let Err(e) = config.set("system", key, value.into()) {
        log::warn!("could not persist system.{}: {}", key, e);
    }
}

/// Returns the temp directory to use.
///
/// Prefers the configured `system.temppath`; otherwise creates a
/// per-hostname directory under the operating system temp path (to avoid
/// interference with other software) and persists it. `None` means the
/// operating system is configured badly.
pub fn temp_path(config: &dyn ConfigStore, hostname: &str) -> Option<PathBuf> {
    if let Some(configured) = configured_path(config, "temppath") {
        return Some(configured);
    }

    let system_temp = std::env::temp_dir();
    if !directory_usable(&system_temp) {
        return None;
    }
    let system_temp = system_temp.canonicalize().unwrap_or(system_temp);

    let own = system_temp.join(hostname);
    if !own.is_dir() {
        if let Err(e) = fs::create_dir(&own) {
            log::warn!("could not create temp directory {}: {}", own.display(), e);
        }
    }

    if directory_usable(&own) {
        store_path(config, "temppath", &own);
        Some(own)
    } else {
        // We can't create a subdirectory, strange. The parent works, so use
        // it without storing it.
        Some(system_temp)
    }
}

fn cache_duration(config: &dyn ConfigStore) -> Option<Duration> {
    let configured = config
        .get("system", "itemcache_duration")
        .and_then(|v| v.as_i64())
        .unwrap_or(0);
    if configured < 0 {
        // Cache deactivated.
        return None;
    }
    if configured == 0 {
        Some(DEFAULT_CACHE_DURATION)
    } else {
        Some(Duration::from_secs(configured as u64))
    }
}

/// Returns the path where rendered items are cached, or `None` when the
/// item cache is deactivated (`system.itemcache_duration` below zero) or no
/// writable location exists.
pub fn item_cache_path(config: &dyn ConfigStore, hostname: &str) -> Option<PathBuf> {
    cache_duration(config)?;

    if let Some(configured) = configured_path(config, "itemcache") {
        return Some(configured);
    }

    let cache = temp_path(config, hostname)?.join("itemcache");
    if !cache.is_dir() {
        if let Err(e) = fs::create_dir(&cache) {
            log::warn!("could not create item cache {}: {}", cache.display(), e);
        }
    }
    if directory_usable(&cache) {
        store_path(config, "itemcache", &cache);
        Some(cache)
    } else {
        None
    }
}

/// Returns the path where spool files are stored.
pub fn spool_path(config: &dyn ConfigStore, hostname: &str) -> Option<PathBuf> {
    if let Some(configured) = configured_path(config, "spoolpath") {
        return Some(configured);
    }

    let temp = temp_path(config, hostname)?;
    let spool = temp.join("spool");
    if !spool.is_dir() {
        if let Err(e) = fs::create_dir(&spool) {
            log::warn!("could not create spool directory {}: {}", spool.display(), e);
        }
    }
    if directory_usable(&spool) {
        store_path(config, "spoolpath", &spool);
        Some(spool)
    } else {
        Some(temp)
    }
}

/// Path of a cache file inside the item cache, fanned out into two-character
/// subfolders. With `writemode` the subfolder is created.
pub fn cache_file(
    config: &dyn ConfigStore,
    hostname: &str,
    file: &str,
    writemode: bool,
) -> Option<PathBuf> {
    let cache = item_cache_path(config, hostname)?;

    let prefix: String = file.chars().take(2).collect();
    let subfolder = cache.join(prefix);

    if writemode && !subfolder.is_dir() {
        if let Err(e) = fs::create_dir(&subfolder) {
            log::warn!("could not create cache subfolder {}: {}", subfolder.display(), e);
            return None;
        }
    }

    Some(subfolder.join(file))
}

/// Remove expired files from the item cache, recursing into the fan-out
/// subfolders. Paths escaping the cache base (through symlinks) are left
/// alone.
pub fn clear_cache(config: &dyn ConfigStore, hostname: &str) {
    let Some(base) = item_cache_path(config, hostname) else {
        return;
    };
    let Some(duration) = cache_duration(config) else {
        return;
    };
    // A duration beyond the representable time range means nothing can
    // have expired yet.
    let Some(cutoff) = SystemTime::now().checked_sub(duration) else {
        return;
    };
    clear_cache_dir(&base, &base, cutoff);
}

fn clear_cache_dir(base: &Path, dir: &Path, cutoff: SystemTime) {
    match (dir.canonicalize(), base.canonicalize()) {
        (Ok(real_dir), Ok(real_base)) if real_dir.starts_with(&real_base) => {}
        _ => return,
    }

    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            clear_cache_dir(base, &path, cutoff);
        } else if let Ok(meta) = entry.metadata() {
            let changed = meta.modified().or_else(|_| meta.created());
            if matches!(changed, Ok(t) if t < cutoff) {
                if let Err(e) = fs::remove_file(&path) {
                    log::warn!("could not expire cache file {}: {}", path.display(), e);
                }
            }
        }
    }
}
