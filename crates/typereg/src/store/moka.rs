//! Sharded concurrent store backed by `mini_moka`.

use super::traits::{Enumerable, Store};
use crate::config::CacheConfig;
use crate::error::{RegistryError, Result};
use mini_moka::sync::Cache;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A concurrent in-memory store.
///
/// Unbounded unless a time-to-live is configured, in which case entries
/// expire `ttl` after insertion. There is no native insert-if-absent, so
/// `register` on a cache over this store falls back to get-then-set.
pub struct MokaStore<V> {
    items: Cache<String, Stamped<V>>,
    ttl: Option<Duration>,
}

/// A value and the moment it was written.
#[derive(Clone)]
struct Stamped<V> {
    value: V,
    written: Instant,
}

impl<V: Clone + Send + Sync + 'static> Default for MokaStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> MokaStore<V> {
    pub fn new() -> Self {
        Self {
            items: Cache::builder().build(),
            ttl: None,
        }
    }

    /// A store whose entries expire `ttl` after they are written.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            items: Cache::builder().time_to_live(ttl).build(),
            ttl: Some(ttl),
        }
    }

    fn stamped(&self, key: &str) -> Result<Stamped<V>> {
        self.items
            .get(&key.to_string())
            .ok_or_else(|| RegistryError::not_found(CacheConfig::MOKA_STORE_TYPE, key))
    }
}

impl<V: Clone + Send + Sync + 'static> Store<V> for MokaStore<V> {
    fn get(&self, key: &str) -> Result<V> {
        self.stamped(key).map(|stamped| stamped.value)
    }

    fn get_with_ttl(&self, key: &str) -> Result<(V, Option<Duration>)> {
        let stamped = self.stamped(key)?;
        let remaining = self
            .ttl
            .map(|ttl| ttl.saturating_sub(stamped.written.elapsed()));
        Ok((stamped.value, remaining))
    }

    fn set(&self, key: &str, value: V) -> Result<()> {
        let stamped = Stamped {
            value,
            written: Instant::now(),
        };
        self.items.insert(key.to_string(), stamped);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.items.invalidate(&key.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.items.invalidate_all();
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        CacheConfig::MOKA_STORE_TYPE
    }

    fn as_enumerable(&self) -> Option<&dyn Enumerable<V>> {
        Some(self)
    }
}

impl<V: Clone + Send + Sync + 'static> Enumerable<V> for MokaStore<V> {
    fn get_all(&self) -> Result<HashMap<String, V>> {
        Ok(self
            .items
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect())
    }
}
