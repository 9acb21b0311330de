//! Durable backend over a persistent, capacity-limited key-value store

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::{Policy, StorageBackend};
use crate::cache::clock::Clock;
use crate::cache::config::CacheConfig;
use crate::cache::entry::{CacheEntry, CacheKey, CacheStats, Day};
use crate::cache::error::CacheError;
use crate::cache::store::{FileStore, KeyValueStore};

/// Persists entries as JSON records in a [`KeyValueStore`]
///
/// Every record key carries the configured namespace, so the store can be
/// shared with unrelated data. When a write hits the store's quota, stale
/// entries of every resource are swept and the write is retried once.
#[derive(Debug)]
pub struct DurableBackend<S = FileStore> {
    store: S,
    namespace: String,
    policy: Policy,
}

impl DurableBackend<FileStore> {
    /// Opens the file-backed store described by `config`
    pub fn open(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        let dir = config.resolve_dir().ok_or(CacheError::NoCacheDir)?;
        debug!(dir = %dir.display(), "opening durable cache store");
        Ok(Self::new(FileStore::new(dir, config.quota_bytes), config, clock))
    }
}

impl<S: KeyValueStore> DurableBackend<S> {
    pub fn new(store: S, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            namespace: config.namespace.clone(),
            policy: Policy::new(config, clock),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Keys in this cache's namespace, paired with their parsed form
    ///
    /// Keys that carry the namespace but do not parse are still ours and are
    /// returned with `None` so callers can delete them.
    fn own_keys(&self) -> Vec<(String, Option<CacheKey>)> {
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "failed to list cache store keys");
                return Vec::new();
            }
        };
        let prefix = format!("{}:", self.namespace);
        keys.into_iter()
            .filter(|key| key.starts_with(&prefix))
            .map(|key| {
                let parsed = CacheKey::parse(&self.namespace, &key);
                (key, parsed)
            })
            .collect()
    }

    fn remove(&mut self, raw_key: &str) {
        if let Err(e) = self.store.remove_item(raw_key) {
            warn!(key = raw_key, error = %e, "failed to remove cache record");
        }
    }

    /// Removes every owned key matching `doomed`; returns how many went
    fn remove_where<F>(&mut self, mut doomed: F) -> usize
    where
        F: FnMut(Option<&CacheKey>) -> bool,
    {
        let victims: Vec<String> = self
            .own_keys()
            .into_iter()
            .filter(|(_, parsed)| doomed(parsed.as_ref()))
            .map(|(raw, _)| raw)
            .collect();
        for raw in &victims {
            self.remove(raw);
        }
        victims.len()
    }

    /// Drops entries of `resource` outside the retention window or schema version
    fn cleanup_resource(&mut self, resource: &str) -> usize {
        let policy = self.policy.clone();
        self.remove_where(|key| {
            key.is_some_and(|key| key.resource == resource && !policy.retains(key))
        })
    }

    /// Drops stale entries of every resource, plus unparseable owned keys
    fn sweep_stale(&mut self) -> usize {
        let policy = self.policy.clone();
        self.remove_where(|key| key.map_or(true, |key| !policy.retains(key)))
    }

    fn write_with_recovery(&mut self, raw_key: &str, record: &str) -> Result<(), CacheError> {
        match self.store.set_item(raw_key, record) {
            Ok(()) => Ok(()),
            Err(e) if e.is_quota_exceeded() => {
                let swept = self.sweep_stale();
                warn!(key = raw_key, swept, error = %e, "cache store full, retrying after stale sweep");
                match self.store.set_item(raw_key, record) {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        error!(key = raw_key, error = %e, "dropping cache write after retry");
                        if e.is_quota_exceeded() {
                            Err(CacheError::QuotaExhausted {
                                key: raw_key.to_string(),
                            })
                        } else {
                            Err(e.into())
                        }
                    }
                }
            }
            Err(e) => {
                warn!(key = raw_key, error = %e, "dropping cache write");
                Err(e.into())
            }
        }
    }
}

impl<S: KeyValueStore + fmt::Debug + Send> StorageBackend for DurableBackend<S> {
    fn name(&self) -> &'static str {
        "durable"
    }

    fn get(&mut self, resource: &str, day: Option<Day>) -> Option<Value> {
        let day = self.policy.resolve_day(day);
        let raw_key = self.policy.key(resource, day).to_storage_key(&self.namespace);

        let raw = match self.store.get_item(&raw_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %raw_key, error = %e, "failed to read cache record");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key = %raw_key, error = %e, "removing malformed cache record");
                self.remove(&raw_key);
                return None;
            }
        };

        if let Err(reason) = self.policy.check(&entry, day) {
            debug!(key = %raw_key, %reason, "removing stale cache record");
            self.remove(&raw_key);
            return None;
        }

        Some(entry.data)
    }

    fn set(&mut self, resource: &str, data: Value, day: Option<Day>) -> Result<(), CacheError> {
        let day = self.policy.resolve_day(day);
        let raw_key = self.policy.key(resource, day).to_storage_key(&self.namespace);
        let record = serde_json::to_string(&self.policy.entry(data, day))?;

        self.write_with_recovery(&raw_key, &record)?;

        let removed = self.cleanup_resource(resource);
        if removed > 0 {
            debug!(resource, removed, "removed entries outside retention window");
        }
        Ok(())
    }

    fn clear(&mut self, resource: &str, day: Option<Day>) {
        let day = self.policy.resolve_day(day);
        let raw_key = self.policy.key(resource, day).to_storage_key(&self.namespace);
        self.remove(&raw_key);
    }

    fn clear_all_for_resource(&mut self, resource: &str) {
        let removed = self.remove_where(|key| key.is_some_and(|key| key.resource == resource));
        debug!(resource, removed, "cleared resource");
    }

    fn clear_all(&mut self) {
        let removed = self.remove_where(|_| true);
        debug!(removed, "cleared durable cache");
    }

    fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for (raw_key, parsed) in self.own_keys() {
            let Some(key) = parsed else { continue };
            let Ok(Some(raw)) = self.store.get_item(&raw_key) else {
                continue;
            };
            if let Ok(entry) = serde_json::from_str::<CacheEntry>(&raw) {
                stats.record(&key.resource, entry.written_at);
            }
        }
        stats
    }
}
