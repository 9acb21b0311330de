//! In-process backend that lives as long as the cache does

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{Policy, StorageBackend};
use crate::cache::clock::Clock;
use crate::cache::config::CacheConfig;
use crate::cache::entry::{CacheEntry, CacheKey, CacheStats, Day};
use crate::cache::error::CacheError;

/// Keeps entries in a map; nothing survives the process
#[derive(Debug)]
pub struct EphemeralBackend {
    entries: HashMap<CacheKey, CacheEntry>,
    policy: Policy,
}

impl EphemeralBackend {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            policy: Policy::new(config, clock),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_where<F>(&mut self, mut doomed: F) -> usize
    where
        F: FnMut(&CacheKey) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, _| !doomed(key));
        before - self.entries.len()
    }
}

impl StorageBackend for EphemeralBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&mut self, resource: &str, day: Option<Day>) -> Option<Value> {
        let day = self.policy.resolve_day(day);
        let key = self.policy.key(resource, day);

        let entry = self.entries.get(&key)?;

        if let Err(reason) = self.policy.check(entry, day) {
            debug!(key = %key, %reason, "removing stale cache entry");
            self.entries.remove(&key);
            return None;
        }

        Some(entry.data.clone())
    }

    fn set(&mut self, resource: &str, data: Value, day: Option<Day>) -> Result<(), CacheError> {
        let day = self.policy.resolve_day(day);
        let key = self.policy.key(resource, day);
        let entry = self.policy.entry(data, day);
        self.entries.insert(key, entry);

        let policy = self.policy.clone();
        let removed = self.remove_where(|k| k.resource == resource && !policy.retains(k));
        if removed > 0 {
            debug!(resource, removed, "removed entries outside retention window");
        }
        Ok(())
    }

    fn clear(&mut self, resource: &str, day: Option<Day>) {
        let day = self.policy.resolve_day(day);
        self.entries.remove(&self.policy.key(resource, day));
    }

    fn clear_all_for_resource(&mut self, resource: &str) {
        let removed = self.remove_where(|k| k.resource == resource);
        debug!(resource, removed, "cleared resource");
    }

    fn clear_all(&mut self) {
        self.entries.clear();
    }

    fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for (key, entry) in &self.entries {
            stats.record(&key.resource, entry.written_at);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use chrono::{Duration, Local, TimeZone};
    use serde_json::json;

    fn day(s: &str) -> Day {
        s.parse().unwrap()
    }

    fn create_test_backend() -> (EphemeralBackend, ManualClock) {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let backend = EphemeralBackend::new(&CacheConfig::default(), Arc::new(clock.clone()));
        (backend, clock)
    }

    #[test]
    fn test_set_then_get() {
        let (mut backend, _clock) = create_test_backend();
        backend.set("props", json!({"items": ["a"]}), None).unwrap();

        assert_eq!(backend.get("props", None), Some(json!({"items": ["a"]})));
    }

    #[test]
    fn test_get_other_day_misses() {
        let (mut backend, _clock) = create_test_backend();
        backend.set("props", json!(1), Some(day("2024-03-01"))).unwrap();

        assert_eq!(backend.get("props", Some(day("2024-02-29"))), None);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_overwrite_is_last_write_wins() {
        let (mut backend, _clock) = create_test_backend();
        backend.set("props", json!("first"), None).unwrap();
        backend.set("props", json!("second"), None).unwrap();

        assert_eq!(backend.get("props", None), Some(json!("second")));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_expired_entry_removed_on_read() {
        let (mut backend, clock) = create_test_backend();
        backend.set("props", json!(1), None).unwrap();

        clock.advance(Duration::hours(24) + Duration::seconds(1));

        assert_eq!(backend.get("props", Some(day("2024-03-01"))), None);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_retention_window_spares_other_resources() {
        let (mut backend, clock) = create_test_backend();
        clock.set(Local.with_ymd_and_hms(2024, 2, 20, 12, 0, 0).unwrap());
        backend.set("props", json!("old"), None).unwrap();
        backend.set("lines", json!("old"), None).unwrap();

        clock.set(Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        backend.set("props", json!("new"), None).unwrap();

        let stats = backend.stats();
        assert_eq!(stats.entries_by_resource.get("props"), Some(&1));
        assert_eq!(stats.entries_by_resource.get("lines"), Some(&1));
    }

    #[test]
    fn test_clear_twice_is_harmless() {
        let (mut backend, _clock) = create_test_backend();
        backend.clear("props", None);
        backend.clear("props", None);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_stats_reports_timestamps() {
        let (mut backend, clock) = create_test_backend();
        let first = clock.now().timestamp_millis();
        backend.set("a", json!(1), None).unwrap();
        clock.advance(Duration::minutes(5));
        backend.set("b", json!(2), None).unwrap();

        let stats = backend.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.oldest_written_at, Some(first));
        assert_eq!(
            stats.newest_written_at,
            Some(first + Duration::minutes(5).num_milliseconds())
        );
    }
}
