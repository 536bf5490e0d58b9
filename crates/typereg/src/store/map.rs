//! Single-lock in-memory store.

use super::traits::{Enumerable, Registrar, Store};
use crate::config::CacheConfig;
use crate::error::{RegistryError, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// A `HashMap` guarded by one `RwLock`.
///
/// Entries never expire. Supports atomic insert-if-absent and enumeration.
pub struct MapStore<V> {
    items: RwLock<HashMap<String, V>>,
}

impl<V> Default for MapStore<V> {
    fn default() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> MapStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Poisoning only means a writer panicked mid-call; every write here is a
    // single map operation, so the map itself is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, V>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, V>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone + Send + Sync> Store<V> for MapStore<V> {
    fn get(&self, key: &str) -> Result<V> {
        self.read()
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(CacheConfig::MAP_STORE_TYPE, key))
    }

    fn get_with_ttl(&self, key: &str) -> Result<(V, Option<Duration>)> {
        self.get(key).map(|value| (value, None))
    }

    fn set(&self, key: &str, value: V) -> Result<()> {
        self.write().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.write().clear();
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        CacheConfig::MAP_STORE_TYPE
    }

    fn as_registrar(&self) -> Option<&dyn Registrar<V>> {
        Some(self)
    }

    fn as_enumerable(&self) -> Option<&dyn Enumerable<V>> {
        Some(self)
    }
}

impl<V> Registrar<V> for MapStore<V> {
    fn register(&self, key: &str, value: V) -> Result<()> {
        match self.write().entry(key.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyExists {
                what: format!("key {:?}", key),
            }),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }
}

impl<V: Clone> Enumerable<V> for MapStore<V> {
    fn get_all(&self) -> Result<HashMap<String, V>> {
        Ok(self.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_set_and_get() {
        let store = MapStore::new();
        store.set("a", 1u32).unwrap();
        assert_eq!(store.get("a").unwrap(), 1);
        assert_eq!(store.get_with_ttl("a").unwrap(), (1, None));
        assert_eq!(store.store_type(), "map");
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let store: MapStore<u32> = MapStore::new();
        let err = store.get("missing").unwrap_err();
        assert!(err.is_key_not_found());
    }

    #[test]
    fn test_delete_and_clear() {
        let store = MapStore::new();
        store.set("a", 1u32).unwrap();
        store.set("b", 2u32).unwrap();
        store.delete("a").unwrap();
        store.delete("a").unwrap();
        assert!(store.get("a").is_err());
        assert_eq!(store.len(), 1);
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_register_is_insert_if_absent() {
        let store = MapStore::new();
        let registrar = store.as_registrar().unwrap();
        registrar.register("a", 1u32).unwrap();
        let err = registrar.register("a", 2u32).unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(store.get("a").unwrap(), 1);
    }

    #[test]
    fn test_get_all() {
        let store = MapStore::new();
        store.set("a", 1u32).unwrap();
        store.set("b", 2u32).unwrap();
        let all = store.as_enumerable().unwrap().get_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["b"], 2);
    }

    #[test]
    fn test_concurrent_register_single_winner() {
        let store = Arc::new(MapStore::new());
        let winners: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let store = Arc::clone(&store);
                    scope.spawn(move || store.register("slot", i).is_ok() as usize)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(winners, 1);
    }
}
