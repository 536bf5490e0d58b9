//! Per-tag instance cache: a store plus an optional loader.

use crate::capabilities::Loader;
use crate::config::CacheConfig;
use crate::context::Context;
use crate::error::{RegistryError, Result};
use crate::store::{MapStore, Store};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What a loadable cache does with a freshly loaded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Commit the loaded value to the store; later gets hit the store and
    /// the loader is not called again until the key is deleted or cleared.
    #[default]
    WriteBack,
    /// Return the loaded value without storing it; every miss calls the
    /// loader again.
    PassThrough,
}

/// A store bound to one type, optionally backed by a loader.
///
/// Without a loader this is a plain cache. With one, a store miss invokes
/// the loader on the calling thread and, under [`LoadPolicy::WriteBack`],
/// commits the result before returning it.
pub struct InstanceCache<T> {
    store: Arc<dyn Store<T>>,
    loader: Option<Loader<T>>,
    policy: LoadPolicy,
}

impl<T> Clone for InstanceCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            loader: self.loader.clone(),
            policy: self.policy,
        }
    }
}

impl<T> std::fmt::Debug for InstanceCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache_type = if self.loader.is_some() {
            CacheConfig::LOADABLE_CACHE_TYPE
        } else {
            CacheConfig::PLAIN_CACHE_TYPE
        };
        f.debug_struct("InstanceCache")
            .field("cache_type", &cache_type)
            .field("store_type", &self.store.store_type())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for InstanceCache<T> {
    fn default() -> Self {
        Self::new(MapStore::new())
    }
}

impl<T: Clone + Send + Sync + 'static> InstanceCache<T> {
    /// A plain cache over `store`.
    pub fn new(store: impl Store<T> + 'static) -> Self {
        Self::with_store(Arc::new(store))
    }

    /// A plain cache over a shared store.
    pub fn with_store(store: Arc<dyn Store<T>>) -> Self {
        Self {
            store,
            loader: None,
            policy: LoadPolicy::default(),
        }
    }

    /// A loadable cache over `store`.
    pub fn loadable<F>(store: impl Store<T> + 'static, loader: F) -> Self
    where
        F: Fn(&Context, &str) -> Result<T> + Send + Sync + 'static,
    {
        Self::with_store(Arc::new(store)).with_loader(Arc::new(loader))
    }

    pub fn with_loader(mut self, loader: Loader<T>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_loadable(&self) -> bool {
        self.loader.is_some()
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    pub fn cache_type(&self) -> &'static str {
        if self.is_loadable() {
            CacheConfig::LOADABLE_CACHE_TYPE
        } else {
            CacheConfig::PLAIN_CACHE_TYPE
        }
    }

    pub fn store_type(&self) -> &'static str {
        self.store.store_type()
    }

    pub fn store(&self) -> &Arc<dyn Store<T>> {
        &self.store
    }

    /// Get a value, falling back to the loader on a store miss.
    pub fn get(&self, ctx: &Context, key: &str) -> Result<T> {
        ctx.check()?;
        match self.store.get(key) {
            Err(err) if err.is_key_not_found() => self.load(ctx, key, err),
            other => other,
        }
    }

    /// Get a value and its remaining time-to-live (`None` = no expiration).
    pub fn get_with_ttl(&self, ctx: &Context, key: &str) -> Result<(T, Option<Duration>)> {
        ctx.check()?;
        match self.store.get_with_ttl(key) {
            Err(err) if err.is_key_not_found() => {
                let value = self.load(ctx, key, err)?;
                let ttl = match self.policy {
                    LoadPolicy::WriteBack => self.store.get_with_ttl(key).ok().and_then(|(_, ttl)| ttl),
                    LoadPolicy::PassThrough => None,
                };
                Ok((value, ttl))
            }
            other => other,
        }
    }

    fn load(&self, ctx: &Context, key: &str, miss: RegistryError) -> Result<T> {
        let Some(loader) = &self.loader else {
            return Err(miss);
        };
        ctx.check()?;
        debug!("Cache miss for {:?}, invoking loader", key);
        let value = loader(ctx, key)?;
        if self.policy == LoadPolicy::WriteBack {
            self.store.set(key, value.clone())?;
            debug!("Committed loaded value for {:?} to {} store", key, self.store_type());
        }
        Ok(value)
    }

    /// Get several values in order, failing on the first error.
    pub fn get_many<K: AsRef<str>>(&self, ctx: &Context, keys: &[K]) -> Result<Vec<T>> {
        keys.iter().map(|key| self.get(ctx, key.as_ref())).collect()
    }

    /// Every value currently in the store. Loaders are not consulted.
    pub fn get_all(&self, ctx: &Context) -> Result<HashMap<String, T>> {
        ctx.check()?;
        match self.store.as_enumerable() {
            Some(enumerable) => enumerable.get_all(),
            None => Err(RegistryError::InvalidCacheKind {
                type_id: String::new(),
                message: format!("{} store cannot enumerate its entries", self.store_type()),
            }),
        }
    }

    pub fn set(&self, ctx: &Context, key: &str, value: T) -> Result<()> {
        ctx.check()?;
        self.store.set(key, value)
    }

    /// Insert `value` unless `key` is already in the store.
    ///
    /// Atomic when the store implements [`Registrar`](crate::store::Registrar).
    /// Otherwise this is a get followed by a set, and two concurrent callers
    /// registering the same key may both succeed, the later write winning.
    /// The loader is never consulted.
    pub fn register(&self, ctx: &Context, key: &str, value: T) -> Result<()> {
        ctx.check()?;
        if let Some(registrar) = self.store.as_registrar() {
            return registrar.register(key, value);
        }
        match self.store.get(key) {
            Ok(_) => Err(RegistryError::AlreadyExists {
                what: format!("key {:?}", key),
            }),
            Err(err) if err.is_key_not_found() => self.store.set(key, value),
            Err(err) => Err(err),
        }
    }

    pub fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        ctx.check()?;
        self.store.delete(key)
    }

    /// Delete every listed key.
    pub fn invalidate<K: AsRef<str>>(&self, ctx: &Context, keys: &[K]) -> Result<()> {
        keys.iter().try_for_each(|key| self.delete(ctx, key.as_ref()))
    }

    pub fn clear(&self, ctx: &Context) -> Result<()> {
        ctx.check()?;
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MokaStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_cache(policy: LoadPolicy) -> (InstanceCache<String>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = InstanceCache::loadable(MapStore::new(), move |_ctx: &Context, key: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            if key == "broken" {
                return Err(RegistryError::Other("loader exploded".into()));
            }
            Ok(format!("loaded:{key}"))
        })
        .with_policy(policy);
        (cache, calls)
    }

    #[test]
    fn test_plain_cache_miss() {
        let cache: InstanceCache<String> = InstanceCache::default();
        let ctx = Context::background();
        assert!(cache.get(&ctx, "a").unwrap_err().is_key_not_found());
        assert_eq!(cache.cache_type(), "cache");
        assert_eq!(cache.store_type(), "map");
    }

    #[test]
    fn test_debug_reports_kind() {
        let (cache, _) = counting_cache(LoadPolicy::PassThrough);
        let rendered = format!("{:?}", cache);
        assert!(rendered.contains("loadable"), "{rendered}");
        assert!(rendered.contains("map"), "{rendered}");
        assert!(rendered.contains("PassThrough"), "{rendered}");
    }

    #[test]
    fn test_loader_writes_back_once() {
        let (cache, calls) = counting_cache(LoadPolicy::WriteBack);
        let ctx = Context::background();
        assert_eq!(cache.get(&ctx, "k").unwrap(), "loaded:k");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.store().get("k").unwrap(), "loaded:k");
        assert_eq!(cache.get(&ctx, "k").unwrap(), "loaded:k");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cache_type(), "loadable");
    }

    #[test]
    fn test_pass_through_reloads() {
        let (cache, calls) = counting_cache(LoadPolicy::PassThrough);
        let ctx = Context::background();
        cache.get(&ctx, "k").unwrap();
        cache.get(&ctx, "k").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.store().get("k").is_err());
    }

    #[test]
    fn test_loader_error_propagates_unchanged() {
        let (cache, _) = counting_cache(LoadPolicy::WriteBack);
        let err = cache.get(&Context::background(), "broken").unwrap_err();
        assert!(matches!(err, RegistryError::Other(ref m) if m == "loader exploded"));
        assert!(cache.store().get("broken").is_err());
    }

    #[test]
    fn test_stored_value_shadows_loader() {
        let (cache, calls) = counting_cache(LoadPolicy::WriteBack);
        let ctx = Context::background();
        cache.set(&ctx, "k", "stored".to_string()).unwrap();
        assert_eq!(cache.get(&ctx, "k").unwrap(), "stored");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_register_fallback_without_registrar() {
        let cache = InstanceCache::new(MokaStore::new());
        let ctx = Context::background();
        cache.register(&ctx, "a", 1u8).unwrap();
        assert!(cache.register(&ctx, "a", 2u8).unwrap_err().is_already_exists());
        assert_eq!(cache.get(&ctx, "a").unwrap(), 1);
    }

    #[test]
    fn test_get_many_and_invalidate() {
        let cache = InstanceCache::new(MapStore::new());
        let ctx = Context::background();
        cache.set(&ctx, "a", 1u8).unwrap();
        cache.set(&ctx, "b", 2u8).unwrap();
        assert_eq!(cache.get_many(&ctx, &["a", "b"]).unwrap(), vec![1, 2]);
        assert!(cache.get_many(&ctx, &["a", "zz"]).is_err());
        cache.invalidate(&ctx, &["a", "b"]).unwrap();
        assert!(cache.get_all(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_context_skips_loader() {
        let (cache, calls) = counting_cache(LoadPolicy::WriteBack);
        let ctx = Context::background();
        ctx.token().cancel();
        assert!(matches!(cache.get(&ctx, "k"), Err(RegistryError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
