//! Day-scoped resource cache
//!
//! Memoizes server responses per logical calendar day. Entries carry the day
//! they belong to, their write time and a schema version; a read only succeeds
//! when all three still line up, otherwise the entry is deleted and the caller
//! sees a miss. Storage is pluggable: a durable file-backed store with quota
//! recovery, or an in-process map.

pub mod backend;
mod clock;
mod config;
mod entry;
mod error;
mod manager;
mod store;

pub use backend::{DurableBackend, EphemeralBackend, Policy, StorageBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, DEFAULT_QUOTA_BYTES};
pub use entry::{CacheEntry, CacheKey, CacheStats, Day, Staleness, NAMESPACE, SCHEMA_VERSION};
pub use error::{CacheError, StoreError};
pub use manager::{CacheManager, Provider};
pub use store::{FileStore, KeyValueStore, MemoryStore};
