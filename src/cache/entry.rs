//! Cache entry envelope, composite keys and logical days

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Schema version written into every entry by this build
pub const SCHEMA_VERSION: &str = "1";

/// Key prefix identifying this cache and its key format
pub const NAMESPACE: &str = "daycache_v1";

/// A logical calendar day (`YYYY-MM-DD`) that cache entries are scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Day(NaiveDate);

impl Day {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The host-local calendar day containing `instant`
    pub fn of<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self(instant.with_timezone(&Local).date_naive())
    }

    /// The day before this one
    ///
    /// Saturates at the earliest representable date.
    pub fn pred(self) -> Self {
        Self(self.0.pred_opt().unwrap_or(self.0))
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for Day {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for Day {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self)
    }
}

/// Composite identity of one cache entry: `(resource, day, schema version)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub resource: String,
    pub day: Day,
    pub version: String,
}

impl CacheKey {
    pub fn new(resource: impl Into<String>, day: Day, version: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            day,
            version: version.into(),
        }
    }

    /// Renders the flat storage key `<namespace>:<resource>:<day>:<version>`
    pub fn to_storage_key(&self, namespace: &str) -> String {
        format!(
            "{}:{}:{}:{}",
            namespace, self.resource, self.day, self.version
        )
    }

    /// Parses a flat storage key, returning `None` for keys outside `namespace`
    ///
    /// The resource component may itself contain `:`; day and version are
    /// taken from the right.
    pub fn parse(namespace: &str, key: &str) -> Option<Self> {
        let rest = key.strip_prefix(namespace)?.strip_prefix(':')?;
        let mut parts = rest.rsplitn(3, ':');
        let version = parts.next()?;
        let day = parts.next()?.parse().ok()?;
        let resource = parts.next()?;
        Some(Self::new(resource, day, version))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.resource, self.day, self.version)
    }
}

/// Why an entry can no longer be served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    VersionMismatch,
    DayMismatch,
    Expired,
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Staleness::VersionMismatch => "schema version mismatch",
            Staleness::DayMismatch => "day mismatch",
            Staleness::Expired => "expired",
        };
        f.write_str(reason)
    }
}

/// Envelope stored for every cached value
///
/// Serialized as `{ "data", "day", "writtenAt", "version" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T = Value> {
    /// The cached payload, never inspected by the cache
    pub data: T,
    /// Logical day the entry belongs to
    pub day: Day,
    /// Creation time in milliseconds since the Unix epoch
    pub written_at: i64,
    /// Schema version of the writer
    pub version: String,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, day: Day, written_at: i64, version: impl Into<String>) -> Self {
        Self {
            data,
            day,
            written_at,
            version: version.into(),
        }
    }

    /// Checks the entry against the read-time validity rules
    pub fn check(
        &self,
        day: Day,
        now_ms: i64,
        version: &str,
        max_age_ms: i64,
    ) -> Result<(), Staleness> {
        if self.version != version {
            return Err(Staleness::VersionMismatch);
        }
        if self.day != day {
            return Err(Staleness::DayMismatch);
        }
        match now_ms.checked_sub(self.written_at) {
            Some(age) if age <= max_age_ms => {}
            _ => return Err(Staleness::Expired),
        }
        Ok(())
    }
}

/// Diagnostic summary of the entries a backend holds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub entries_by_resource: BTreeMap<String, usize>,
    pub oldest_written_at: Option<i64>,
    pub newest_written_at: Option<i64>,
}

impl CacheStats {
    pub(crate) fn record(&mut self, resource: &str, written_at: i64) {
        self.total_entries += 1;
        *self
            .entries_by_resource
            .entry(resource.to_string())
            .or_insert(0) += 1;
        self.oldest_written_at = Some(
            self.oldest_written_at
                .map_or(written_at, |oldest| oldest.min(written_at)),
        );
        self.newest_written_at = Some(
            self.newest_written_at
                .map_or(written_at, |newest| newest.max(written_at)),
        );
    }
}
