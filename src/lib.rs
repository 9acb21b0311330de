//! daycache library
//!
//! Exposes the cache and the CLI definitions for use by the `daycache` binary
//! and integration tests.

pub mod cache;
pub mod cli;
pub mod logging;

pub use cache::{
    CacheConfig, CacheError, CacheManager, CacheStats, Day, DurableBackend, EphemeralBackend,
    FileStore, KeyValueStore, ManualClock, MemoryStore, Provider, StorageBackend, SystemClock,
};
