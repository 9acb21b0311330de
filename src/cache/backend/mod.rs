//! Storage backends and the validity policy they share
//!
//! Both backends resolve days, stamp entries and decide staleness through the
//! same [`Policy`], so expiry, versioning and the retention window behave
//! identically whichever backend is active.

mod durable;
mod ephemeral;

pub use durable::DurableBackend;
pub use ephemeral::EphemeralBackend;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::clock::Clock;
use super::config::CacheConfig;
use super::entry::{CacheEntry, CacheKey, CacheStats, Day, Staleness};
use super::error::CacheError;

/// A pluggable key-to-entry store
///
/// `day` arguments default to the current host-local day when `None`.
/// Reads never fail: any problem is reported as a miss.
pub trait StorageBackend: fmt::Debug + Send {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Returns the payload for `resource` on `day` if a valid entry exists
    ///
    /// Stale, foreign-version and malformed entries are deleted before
    /// returning `None`.
    fn get(&mut self, resource: &str, day: Option<Day>) -> Option<Value>;

    /// Stores `data` for `resource` on `day`, then drops entries of the same
    /// resource outside the retention window
    fn set(&mut self, resource: &str, data: Value, day: Option<Day>) -> Result<(), CacheError>;

    /// Removes the entry for `resource` on `day`, if any
    fn clear(&mut self, resource: &str, day: Option<Day>);

    /// Removes every entry of `resource`, whatever its day or version
    fn clear_all_for_resource(&mut self, resource: &str);

    /// Removes every entry this cache owns
    fn clear_all(&mut self);

    fn stats(&self) -> CacheStats;
}

/// Day resolution, entry stamping and validity rules
#[derive(Debug, Clone)]
pub struct Policy {
    clock: Arc<dyn Clock>,
    schema_version: String,
    max_age_ms: i64,
}

impl Policy {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            schema_version: config.schema_version.clone(),
            max_age_ms: config.max_age.num_milliseconds(),
        }
    }

    /// Current host-local calendar day
    pub fn today(&self) -> Day {
        Day::of(&self.clock.now())
    }

    /// The supplied day, or today when none was given
    pub fn resolve_day(&self, day: Option<Day>) -> Day {
        day.unwrap_or_else(|| self.today())
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn key(&self, resource: &str, day: Day) -> CacheKey {
        CacheKey::new(resource, day, self.schema_version.as_str())
    }

    /// A fresh entry stamped with the current time and schema version
    pub fn entry<T>(&self, data: T, day: Day) -> CacheEntry<T> {
        CacheEntry::new(data, day, self.now_ms(), self.schema_version.as_str())
    }

    pub fn check<T>(&self, entry: &CacheEntry<T>, day: Day) -> Result<(), Staleness> {
        entry.check(day, self.now_ms(), &self.schema_version, self.max_age_ms)
    }

    /// Whether `day` is today or yesterday
    pub fn in_retention_window(&self, day: Day) -> bool {
        let today = self.today();
        day == today || day == today.pred()
    }

    /// Whether a stored key should survive a cleanup pass
    pub fn retains(&self, key: &CacheKey) -> bool {
        key.version == self.schema_version && self.in_retention_window(key.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use chrono::{Duration, Local, TimeZone};
    use serde_json::json;

    fn policy_at(y: i32, m: u32, d: u32, h: u32) -> (Policy, ManualClock) {
        let clock = ManualClock::new(Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap());
        let policy = Policy::new(&CacheConfig::default(), Arc::new(clock.clone()));
        (policy, clock)
    }

    fn day(s: &str) -> Day {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolve_day_prefers_supplied_day() {
        let (policy, _clock) = policy_at(2024, 3, 1, 12);
        assert_eq!(policy.resolve_day(Some(day("2023-01-01"))), day("2023-01-01"));
        assert_eq!(policy.resolve_day(None), day("2024-03-01"));
    }

    #[test]
    fn test_retention_window_is_today_and_yesterday() {
        let (policy, _clock) = policy_at(2024, 3, 1, 12);
        assert!(policy.in_retention_window(day("2024-03-01")));
        assert!(policy.in_retention_window(day("2024-02-29")));
        assert!(!policy.in_retention_window(day("2024-02-28")));
        assert!(!policy.in_retention_window(day("2024-03-02")));
    }

    #[test]
    fn test_retains_rejects_other_versions() {
        let (policy, _clock) = policy_at(2024, 3, 1, 12);
        assert!(policy.retains(&CacheKey::new("r", day("2024-03-01"), "1")));
        assert!(!policy.retains(&CacheKey::new("r", day("2024-03-01"), "0")));
    }

    #[test]
    fn test_entry_expires_after_max_age() {
        let (policy, clock) = policy_at(2024, 3, 1, 1);
        let entry = policy.entry(json!("x"), day("2024-03-01"));

        clock.advance(Duration::hours(24));
        assert_eq!(policy.check(&entry, day("2024-03-01")), Ok(()));

        clock.advance(Duration::milliseconds(1));
        assert_eq!(
            policy.check(&entry, day("2024-03-01")),
            Err(Staleness::Expired)
        );
    }
}
