//! Cache manager: the front door for reading and writing day-scoped resources
//!
//! Holds the active storage backend and delegates every operation to it at
//! call time, so the backend can be swapped at any point without transitional
//! state. Payloads are converted to and from `serde_json::Value` here; the
//! backends never see concrete types.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use super::backend::{DurableBackend, EphemeralBackend, StorageBackend};
use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;
use super::entry::{CacheStats, Day};
use super::error::CacheError;

/// Which backend the manager should use
pub enum Provider {
    /// The file-backed store in the configured cache directory
    Durable,
    /// A fresh in-process map
    Memory,
    /// Any caller-supplied backend
    Custom(Box<dyn StorageBackend>),
}

impl Provider {
    pub fn custom(backend: impl StorageBackend + 'static) -> Self {
        Provider::Custom(Box::new(backend))
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Durable => f.write_str("Durable"),
            Provider::Memory => f.write_str("Memory"),
            Provider::Custom(backend) => f.debug_tuple("Custom").field(&backend.name()).finish(),
        }
    }
}

impl FromStr for Provider {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "durable" | "local" | "localstorage" => Ok(Provider::Durable),
            "memory" | "ephemeral" => Ok(Provider::Memory),
            _ => Err(CacheError::UnknownProvider(s.to_string())),
        }
    }
}

/// Owns the active backend and exposes the typed cache operations
///
/// Construct one at startup and pass it by `&mut` to whatever needs the cache.
#[derive(Debug)]
pub struct CacheManager {
    backend: Box<dyn StorageBackend>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheManager {
    /// Creates a manager on the durable backend with default settings
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default(), Arc::new(SystemClock))
    }

    /// Creates a manager on the durable backend described by `config`
    ///
    /// Falls back to the in-memory backend if no cache directory exists.
    pub fn with_config(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let backend = build_backend(Provider::Durable, &config, &clock);
        Self {
            backend,
            config,
            clock,
        }
    }

    /// Creates a manager around an already-built backend
    pub fn with_backend(
        backend: Box<dyn StorageBackend>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            config,
            clock,
        }
    }

    /// Swaps the active backend; existing entries are not migrated
    pub fn set_provider(&mut self, provider: Provider) {
        let previous = self.backend.name();
        self.backend = build_backend(provider, &self.config, &self.clock);
        debug!(from = previous, to = self.backend.name(), "switched cache provider");
    }

    /// Swaps the active backend by well-known name (`durable` or `memory`)
    pub fn set_provider_by_name(&mut self, name: &str) -> Result<(), CacheError> {
        let provider = name.parse()?;
        self.set_provider(provider);
        Ok(())
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Reads `resource` for `day` (today if `None`)
    ///
    /// A payload that no longer deserializes into `T` is treated as malformed:
    /// it is cleared and reported as a miss.
    pub fn get<T: DeserializeOwned>(&mut self, resource: &str, day: Option<Day>) -> Option<T> {
        let value = self.backend.get(resource, day)?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(resource, error = %e, "clearing cache entry with unexpected shape");
                self.backend.clear(resource, day);
                None
            }
        }
    }

    /// Stores `data` for `resource` on `day` (today if `None`)
    ///
    /// A failed write leaves the cache as it was. Callers that treat the
    /// cache as best-effort can ignore the result.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        resource: &str,
        data: &T,
        day: Option<Day>,
    ) -> Result<(), CacheError> {
        let value = serde_json::to_value(data).map_err(|e| {
            warn!(resource, error = %e, "failed to serialize cache payload");
            CacheError::from(e)
        })?;
        self.backend.set(resource, value, day)
    }

    pub fn clear(&mut self, resource: &str, day: Option<Day>) {
        self.backend.clear(resource, day);
    }

    pub fn clear_all_for_resource(&mut self, resource: &str) {
        self.backend.clear_all_for_resource(resource);
    }

    pub fn clear_all(&mut self) {
        self.backend.clear_all();
    }

    pub fn stats(&self) -> CacheStats {
        self.backend.stats()
    }

    /// Today's host-local calendar day
    pub fn today(&self) -> Day {
        Day::of(&self.clock.now())
    }

    /// Whether `day` (`YYYY-MM-DD`) is today; unparseable input is not
    pub fn is_today(&self, day: &str) -> bool {
        day.parse::<Day>().is_ok_and(|day| day == self.today())
    }

    /// Returns the cached value, or computes, stores and returns a fresh one
    pub fn get_or_insert_with<T, F>(&mut self, resource: &str, day: Option<Day>, make: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(cached) = self.get(resource, day) {
            return cached;
        }
        let fresh = make();
        let _ = self.set(resource, &fresh, day);
        fresh
    }

    /// Returns the cached value, or awaits `fetch` and stores its result
    ///
    /// Fetch errors are handed back unchanged and nothing is cached.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &mut self,
        resource: &str,
        day: Option<Day>,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(resource, day) {
            return Ok(cached);
        }
        let fresh = fetch().await?;
        let _ = self.set(resource, &fresh, day);
        Ok(fresh)
    }
}

fn build_backend(
    provider: Provider,
    config: &CacheConfig,
    clock: &Arc<dyn Clock>,
) -> Box<dyn StorageBackend> {
    match provider {
        Provider::Durable => match DurableBackend::open(config, Arc::clone(clock)) {
            Ok(backend) => Box::new(backend),
            Err(e) => {
                warn!(error = %e, "durable cache unavailable, using memory backend");
                Box::new(EphemeralBackend::new(config, Arc::clone(clock)))
            }
        },
        Provider::Memory => Box::new(EphemeralBackend::new(config, Arc::clone(clock))),
        Provider::Custom(backend) => backend,
    }
}
