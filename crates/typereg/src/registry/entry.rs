//! Per-type registry record.

use crate::cache::{default_cache, AnyCache, CacheAdapter, InstanceCache};
use crate::error::{RegistryError, Result};
use crate::identity::{identifier_of, Declared, TypeIdentifier};
use crate::provider::Provider;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

type CacheFactory = Arc<dyn Fn() -> Arc<dyn AnyCache> + Send + Sync>;

/// Summary of one tagged cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub cache_type: String,
    pub store_type: String,
}

/// Serializable snapshot of a [`TypeEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeInfo {
    pub type_id: String,
    pub dependencies: Vec<String>,
    pub description: String,
    pub instances_cache: BTreeMap<String, CacheInfo>,
}

pub(crate) struct EntryState {
    pub(crate) description: String,
    pub(crate) dependencies: Vec<String>,
    pub(crate) caches: BTreeMap<String, Arc<dyn AnyCache>>,
}

/// Everything the registry knows about one type: metadata and the tagged
/// instance caches.
///
/// Each entry has its own lock, so work on one type never contends with
/// work on another. Tags that were never registered explicitly get a
/// default cache the first time they are used.
pub struct TypeEntry {
    identifier: TypeIdentifier,
    default_cache: CacheFactory,
    state: RwLock<EntryState>,
}

impl TypeEntry {
    pub(crate) fn new<T: Declared>(
        provider: Option<Arc<dyn Provider>>,
        description: String,
        dependencies: Vec<String>,
        caches: BTreeMap<String, Arc<dyn AnyCache>>,
    ) -> Self {
        let default_cache: CacheFactory = Arc::new(move || {
            Arc::new(CacheAdapter::new(default_cache::<T>(provider.clone()))) as Arc<dyn AnyCache>
        });
        Self {
            identifier: identifier_of::<T>(),
            default_cache,
            state: RwLock::new(EntryState {
                description,
                dependencies,
                caches,
            }),
        }
    }

    pub fn identifier(&self) -> &TypeIdentifier {
        &self.identifier
    }

    /// Canonical string identifier of the type.
    pub fn type_id(&self) -> &str {
        self.identifier.as_str()
    }

    pub fn description(&self) -> String {
        self.read().description.clone()
    }

    pub fn dependencies(&self) -> Vec<String> {
        self.read().dependencies.clone()
    }

    /// Tags that currently have a cache, in sorted order.
    pub fn tags(&self) -> Vec<String> {
        self.read().caches.keys().cloned().collect()
    }

    /// The cache registered under `tag`, if any.
    pub fn cache(&self, tag: &str) -> Option<Arc<dyn AnyCache>> {
        self.read().caches.get(tag).cloned()
    }

    /// The cache under `tag`, creating a default one if the tag is new.
    pub fn cache_or_default(&self, tag: &str) -> Arc<dyn AnyCache> {
        if let Some(cache) = self.cache(tag) {
            return cache;
        }
        // Built unlocked: the factory runs the type's capability hooks.
        let fresh = (self.default_cache)();
        let mut state = self.write();
        let cache = state.caches.entry(tag.to_string()).or_insert_with(|| {
            debug!("Creating default cache for {}[{}]", self.identifier, tag);
            fresh
        });
        Arc::clone(cache)
    }

    /// The typed cache under `tag`.
    pub fn typed_cache<T: Declared>(&self, tag: &str) -> Result<InstanceCache<T>> {
        let erased = self.cache_or_default(tag);
        erased
            .as_any()
            .downcast_ref::<CacheAdapter<T>>()
            .map(|adapter| adapter.cache().clone())
            .ok_or_else(|| RegistryError::InvalidCacheKind {
                type_id: self.identifier.to_string(),
                message: format!("cache under tag {:?} does not hold {}", tag, identifier_of::<T>()),
            })
    }

    pub fn info(&self) -> TypeInfo {
        let state = self.read();
        TypeInfo {
            type_id: self.identifier.to_string(),
            dependencies: state.dependencies.clone(),
            description: state.description.clone(),
            instances_cache: state
                .caches
                .iter()
                .map(|(tag, cache)| {
                    (
                        tag.clone(),
                        CacheInfo {
                            cache_type: cache.cache_type().to_string(),
                            store_type: cache.store_type().to_string(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, EntryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, EntryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Serialize for TypeEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.info().serialize(serializer)
    }
}

impl std::fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeEntry")
            .field("type_id", &self.type_id())
            .field("tags", &self.tags())
            .finish()
    }
}
