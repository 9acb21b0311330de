//! Cache configuration

use chrono::Duration;
use directories::ProjectDirs;
use std::path::PathBuf;

use super::entry::{NAMESPACE, SCHEMA_VERSION};

/// Default capacity of the durable file store
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Settings shared by the cache backends
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory for the durable store; `None` uses the XDG cache directory
    pub cache_dir: Option<PathBuf>,
    /// Capacity of the durable store in bytes; `None` means unbounded
    pub quota_bytes: Option<u64>,
    /// Prefix of every storage key
    pub namespace: String,
    /// Version stamped on written entries and required on reads
    pub schema_version: String,
    /// Maximum age of a readable entry
    pub max_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
            namespace: NAMESPACE.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            max_age: Duration::hours(24),
        }
    }
}

impl CacheConfig {
    pub fn with_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = Some(cache_dir);
        self
    }

    pub fn with_quota_bytes(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn with_schema_version(mut self, schema_version: impl Into<String>) -> Self {
        self.schema_version = schema_version.into();
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Resolves the durable store directory
    ///
    /// Uses `~/.cache/daycache/` on Linux, or the equivalent XDG path on other
    /// platforms. Returns `None` if no home directory can be determined.
    pub fn resolve_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Some(dir.clone());
        }
        let project_dirs = ProjectDirs::from("", "", "daycache")?;
        Some(project_dirs.cache_dir().to_path_buf())
    }
}
