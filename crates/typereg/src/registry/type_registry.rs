//! The type registry: a concurrent directory of [`TypeEntry`] records.

use super::entry::TypeEntry;
use crate::cache::{AnyCache, CacheAdapter, InstanceCache};
use crate::capabilities::AnyValue;
use crate::config::RegistryConfig;
use crate::context::Context;
use crate::error::{RegistryError, Result};
use crate::identity::{identifier_of, Declared};
use crate::provider::Provider;
use serde_json::Value;
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Options for [`TypeRegistry::register_type`] and [`TypeRegistry::set_type`].
///
/// ```
/// use typereg::{InstanceCache, MokaStore, TypeOptions, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// registry
///     .register_type::<String>(
///         TypeOptions::new()
///             .description("greetings")
///             .cache("hot", InstanceCache::new(MokaStore::new())),
///     )
///     .unwrap();
/// assert_eq!(registry.get_type::<String>().unwrap().tags(), vec!["", "hot"]);
/// ```
pub struct TypeOptions<T> {
    description: Option<String>,
    dependencies: Option<Vec<String>>,
    caches: BTreeMap<String, InstanceCache<T>>,
    use_provider: bool,
}

impl<T> Default for TypeOptions<T> {
    fn default() -> Self {
        Self {
            description: None,
            dependencies: None,
            caches: BTreeMap::new(),
            use_provider: false,
        }
    }
}

impl<T: Declared> TypeOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override [`Declared::description`].
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Override [`Declared::dependencies`].
    pub fn dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Some(dependencies.into_iter().map(Into::into).collect());
        self
    }

    /// Use `cache` for `tag` instead of a default cache.
    pub fn cache(mut self, tag: impl Into<String>, cache: InstanceCache<T>) -> Self {
        self.caches.insert(tag.into(), cache);
        self
    }

    /// Let default caches resolve misses through the registry's provider.
    pub fn use_provider(mut self) -> Self {
        self.use_provider = true;
        self
    }

    fn erased_caches(caches: BTreeMap<String, InstanceCache<T>>) -> BTreeMap<String, Arc<dyn AnyCache>> {
        caches
            .into_iter()
            .map(|(tag, cache)| (tag, Arc::new(CacheAdapter::new(cache)) as Arc<dyn AnyCache>))
            .collect()
    }
}

/// A registration resolved outside the registry lock.
struct Prepared {
    provider: Option<Arc<dyn Provider>>,
    description: Option<String>,
    dependencies: Option<Vec<String>>,
    caches: BTreeMap<String, Arc<dyn AnyCache>>,
}

#[derive(Default)]
struct Index {
    by_id: HashMap<TypeId, Arc<TypeEntry>>,
    by_name: HashMap<String, Arc<TypeEntry>>,
}

impl Index {
    fn check_collision(&self, name: &str, id: TypeId) -> Result<()> {
        match self.by_name.get(name) {
            Some(existing) if existing.identifier().type_id() != id => {
                Err(RegistryError::IdentifierCollision { id: name.to_string() })
            }
            _ => Ok(()),
        }
    }

    fn insert(&mut self, entry: Arc<TypeEntry>) {
        self.by_id.insert(entry.identifier().type_id(), Arc::clone(&entry));
        self.by_name.insert(entry.type_id().to_string(), entry);
    }
}

/// Concurrent directory of declared types and their tagged instance caches.
///
/// Two lock tiers: the registry lock guards only the identity and string
/// indices, and each [`TypeEntry`] guards its own tags and metadata.
#[derive(Default)]
pub struct TypeRegistry {
    index: RwLock<Index>,
    provider: RwLock<Option<Arc<dyn Provider>>>,
}

impl TypeRegistry {
    /// An empty registry with no provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the provider used by registrations that opt in with
    /// [`TypeOptions::use_provider`]. Entries created earlier keep the
    /// provider they were built with.
    pub fn set_provider(&self, provider: Option<Arc<dyn Provider>>) {
        *self.provider.write().unwrap_or_else(PoisonError::into_inner) = provider;
    }

    fn provider_for(&self, use_provider: bool) -> Option<Arc<dyn Provider>> {
        if !use_provider {
            return None;
        }
        self.provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn read_index(&self) -> RwLockReadGuard<'_, Index> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, Index> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve everything a registration needs before any lock is taken:
    /// the provider, the erased caches and the type's own metadata hooks.
    fn prepare<T: Declared>(&self, options: TypeOptions<T>) -> Prepared {
        let TypeOptions {
            description,
            dependencies,
            caches,
            use_provider,
        } = options;
        Prepared {
            provider: self.provider_for(use_provider),
            description,
            dependencies,
            caches: TypeOptions::erased_caches(caches),
        }
    }

    fn build_entry<T: Declared>(prepared: &Prepared) -> TypeEntry {
        let mut caches = prepared.caches.clone();
        if !caches.contains_key(RegistryConfig::DEFAULT_TAG) {
            let default = crate::cache::default_cache::<T>(prepared.provider.clone());
            caches.insert(
                RegistryConfig::DEFAULT_TAG.to_string(),
                Arc::new(CacheAdapter::new(default)),
            );
        }
        TypeEntry::new::<T>(
            prepared.provider.clone(),
            prepared.description.clone().or_else(T::description).unwrap_or_default(),
            prepared.dependencies.clone().or_else(T::dependencies).unwrap_or_default(),
            caches,
        )
    }

    /// Register `T`, or merge new tags into its existing entry.
    ///
    /// A new entry gets the supplied tags plus a default cache for the
    /// default tag. An existing entry gains every supplied tag; if any of
    /// them is already populated the call fails with `AlreadyExists` and
    /// nothing changes. Description and dependencies are overwritten only
    /// when supplied. Registering again with no tags is a no-op.
    ///
    /// The entry is built before the registry lock is taken, so the type's
    /// hooks may themselves read the registry.
    pub fn register_type<T: Declared>(&self, options: TypeOptions<T>) -> Result<()> {
        let id = identifier_of::<T>();
        let prepared = self.prepare(options);
        if let Some(entry) = self.get_type::<T>() {
            return Self::merge(&entry, prepared);
        }
        let built = Arc::new(Self::build_entry::<T>(&prepared));
        let mut index = self.write_index();
        if let Some(entry) = index.by_id.get(&id.type_id()).cloned() {
            drop(index);
            return Self::merge(&entry, prepared);
        }
        index.check_collision(id.as_str(), id.type_id())?;
        index.insert(built);
        drop(index);
        info!("Registered type {}", id);
        Ok(())
    }

    fn merge(entry: &TypeEntry, prepared: Prepared) -> Result<()> {
        let mut state = entry.write();
        if let Some(tag) = prepared
            .caches
            .keys()
            .find(|tag| state.caches.contains_key(tag.as_str()))
        {
            return Err(RegistryError::AlreadyExists {
                what: format!("cache {}[{}]", entry.identifier(), tag),
            });
        }
        if let Some(description) = prepared.description {
            state.description = description;
        }
        if let Some(dependencies) = prepared.dependencies {
            state.dependencies = dependencies;
        }
        for (tag, cache) in prepared.caches {
            debug!("Added cache {}[{}]", entry.identifier(), tag);
            state.caches.insert(tag, cache);
        }
        Ok(())
    }

    /// Replace the entry for `T` wholesale.
    ///
    /// Tags of the previous entry that are not supplied again fall back to
    /// default caches, and their contents are dropped.
    pub fn set_type<T: Declared>(&self, options: TypeOptions<T>) -> Result<()> {
        let prepared = self.prepare(options);
        let entry = Arc::new(Self::build_entry::<T>(&prepared));
        let mut index = self.write_index();
        index.check_collision(entry.type_id(), entry.identifier().type_id())?;
        index.insert(entry);
        drop(index);
        info!("Set type {}", identifier_of::<T>());
        Ok(())
    }

    /// The entry for `T`, if registered.
    pub fn get_type<T: Declared>(&self) -> Option<Arc<TypeEntry>> {
        let id = identifier_of::<T>().type_id();
        self.read_index().by_id.get(&id).cloned()
    }

    /// Look a type up by its canonical string identifier.
    pub fn get_type_by_id(&self, type_id: &str) -> Option<Arc<TypeEntry>> {
        self.read_index().by_name.get(type_id).cloned()
    }

    /// Snapshot of every entry, keyed by string identifier.
    pub fn types(&self) -> BTreeMap<String, Arc<TypeEntry>> {
        self.read_index()
            .by_name
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(entry)))
            .collect()
    }

    /// Forget every type and the configured provider.
    pub fn reset(&self) {
        *self.write_index() = Index::default();
        self.set_provider(None);
        debug!("Registry reset");
    }

    /// Instance operations against `tag` instead of the default tag.
    pub fn tagged<'a>(&'a self, tag: &'a str) -> Tagged<'a> {
        Tagged {
            registry: self,
            tag,
        }
    }

    fn default_tag(&self) -> Tagged<'_> {
        self.tagged(RegistryConfig::DEFAULT_TAG)
    }

    /// Get `key` from the default tag of `T`, loading on a miss when the cache can.
    pub fn get<T: Declared>(&self, ctx: &Context, key: &str) -> Result<T> {
        self.default_tag().get(ctx, key)
    }

    /// Like [`get`](Self::get), plus the remaining time-to-live.
    pub fn get_with_ttl<T: Declared>(&self, ctx: &Context, key: &str) -> Result<(T, Option<Duration>)> {
        self.default_tag().get_with_ttl(ctx, key)
    }

    /// Get several keys in order, failing on the first error.
    pub fn get_many<T: Declared>(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<T>> {
        self.default_tag().get_many(ctx, keys)
    }

    /// Every stored value of `T` under the default tag.
    pub fn get_all<T: Declared>(&self, ctx: &Context) -> Result<HashMap<String, T>> {
        self.default_tag().get_all(ctx)
    }

    /// Insert `value` unless `key` is taken.
    pub fn register<T: Declared>(&self, ctx: &Context, key: &str, value: T) -> Result<()> {
        self.default_tag().register(ctx, key, value)
    }

    /// Insert or overwrite `key`.
    pub fn set<T: Declared>(&self, ctx: &Context, key: &str, value: T) -> Result<()> {
        self.default_tag().set(ctx, key, value)
    }

    /// Remove `key`; removing an absent key succeeds.
    pub fn delete<T: Declared>(&self, ctx: &Context, key: &str) -> Result<()> {
        self.default_tag().delete::<T>(ctx, key)
    }

    /// Remove every listed key.
    pub fn invalidate<T: Declared>(&self, ctx: &Context, keys: &[&str]) -> Result<()> {
        self.default_tag().invalidate::<T>(ctx, keys)
    }

    /// Remove every value of `T` under the default tag.
    pub fn clear<T: Declared>(&self, ctx: &Context) -> Result<()> {
        self.default_tag().clear::<T>(ctx)
    }

    /// Type-erased get by string identifier.
    pub fn get_any(&self, ctx: &Context, type_id: &str, key: &str) -> Result<AnyValue> {
        self.default_tag().get_any(ctx, type_id, key)
    }

    /// Type-erased get of several keys.
    pub fn get_any_many(&self, ctx: &Context, type_id: &str, keys: &[String]) -> Result<Vec<AnyValue>> {
        self.default_tag().get_any_many(ctx, type_id, keys)
    }

    /// Type-erased snapshot of every stored value.
    pub fn get_any_all(&self, ctx: &Context, type_id: &str) -> Result<HashMap<String, AnyValue>> {
        self.default_tag().get_any_all(ctx, type_id)
    }

    /// Type-erased set; the value must downcast to the registered type.
    pub fn set_any(&self, ctx: &Context, type_id: &str, key: &str, value: AnyValue) -> Result<()> {
        self.default_tag().set_any(ctx, type_id, key, value)
    }

    /// Type-erased register; the value must downcast to the registered type.
    pub fn register_any(&self, ctx: &Context, type_id: &str, key: &str, value: AnyValue) -> Result<()> {
        self.default_tag().register_any(ctx, type_id, key, value)
    }

    /// Type-erased delete.
    pub fn delete_any(&self, ctx: &Context, type_id: &str, key: &str) -> Result<()> {
        self.default_tag().delete_any(ctx, type_id, key)
    }

    /// Type-erased clear.
    pub fn clear_any(&self, ctx: &Context, type_id: &str) -> Result<()> {
        self.default_tag().clear_any(ctx, type_id)
    }

    /// Get a value encoded through the type's JSON codec.
    pub fn get_json(&self, ctx: &Context, type_id: &str, key: &str) -> Result<Value> {
        self.default_tag().get_json(ctx, type_id, key)
    }

    /// Decode `value` through the type's JSON codec and set it.
    pub fn set_json(&self, ctx: &Context, type_id: &str, key: &str, value: Value) -> Result<()> {
        self.default_tag().set_json(ctx, type_id, key, value)
    }

    /// Decode `value` through the type's JSON codec and register it.
    pub fn register_json(&self, ctx: &Context, type_id: &str, key: &str, value: Value) -> Result<()> {
        self.default_tag().register_json(ctx, type_id, key, value)
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Instance operations bound to one tag.
///
/// Every failure is wrapped with the operation, type identifier, tag and
/// key it happened on. An unregistered type fails with `TypeNotFound`; a
/// registered type used under a new tag gets a default cache for it.
#[derive(Clone, Copy)]
pub struct Tagged<'a> {
    registry: &'a TypeRegistry,
    tag: &'a str,
}

impl Tagged<'_> {
    pub fn tag(&self) -> &str {
        self.tag
    }

    fn typed<T: Declared>(&self) -> Result<InstanceCache<T>> {
        let entry = self
            .registry
            .get_type::<T>()
            .ok_or_else(|| RegistryError::TypeNotFound {
                type_id: identifier_of::<T>().to_string(),
            })?;
        entry.typed_cache::<T>(self.tag)
    }

    fn erased(&self, type_id: &str) -> Result<Arc<dyn AnyCache>> {
        let entry = self
            .registry
            .get_type_by_id(type_id)
            .ok_or_else(|| RegistryError::TypeNotFound {
                type_id: type_id.to_string(),
            })?;
        Ok(entry.cache_or_default(self.tag))
    }

    fn with_typed<T: Declared, R>(
        &self,
        operation: &'static str,
        key: &str,
        f: impl FnOnce(InstanceCache<T>) -> Result<R>,
    ) -> Result<R> {
        self.typed::<T>()
            .and_then(f)
            .map_err(|err| err.context(operation, identifier_of::<T>().as_str(), self.tag, key))
    }

    fn with_erased<R>(
        &self,
        operation: &'static str,
        type_id: &str,
        key: &str,
        f: impl FnOnce(&dyn AnyCache) -> Result<R>,
    ) -> Result<R> {
        self.erased(type_id)
            .and_then(|cache| f(cache.as_ref()))
            .map_err(|err| err.context(operation, type_id, self.tag, key))
    }

    pub fn get<T: Declared>(&self, ctx: &Context, key: &str) -> Result<T> {
        self.with_typed::<T, _>("get", key, |cache| cache.get(ctx, key))
    }

    pub fn get_with_ttl<T: Declared>(&self, ctx: &Context, key: &str) -> Result<(T, Option<Duration>)> {
        self.with_typed::<T, _>("get_with_ttl", key, |cache| cache.get_with_ttl(ctx, key))
    }

    pub fn get_many<T: Declared>(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<T>> {
        self.with_typed::<T, _>("get_many", &keys.join(","), |cache| cache.get_many(ctx, keys))
    }

    pub fn get_all<T: Declared>(&self, ctx: &Context) -> Result<HashMap<String, T>> {
        self.with_typed::<T, _>("get_all", "", |cache| cache.get_all(ctx))
    }

    pub fn register<T: Declared>(&self, ctx: &Context, key: &str, value: T) -> Result<()> {
        self.with_typed::<T, _>("register", key, |cache| cache.register(ctx, key, value))
    }

    pub fn set<T: Declared>(&self, ctx: &Context, key: &str, value: T) -> Result<()> {
        self.with_typed::<T, _>("set", key, |cache| cache.set(ctx, key, value))
    }

    pub fn delete<T: Declared>(&self, ctx: &Context, key: &str) -> Result<()> {
        self.with_typed::<T, _>("delete", key, |cache| cache.delete(ctx, key))
    }

    pub fn invalidate<T: Declared>(&self, ctx: &Context, keys: &[&str]) -> Result<()> {
        self.with_typed::<T, _>("invalidate", &keys.join(","), |cache| {
            cache.invalidate(ctx, keys)
        })
    }

    pub fn clear<T: Declared>(&self, ctx: &Context) -> Result<()> {
        self.with_typed::<T, _>("clear", "", |cache| cache.clear(ctx))
    }

    pub fn get_any(&self, ctx: &Context, type_id: &str, key: &str) -> Result<AnyValue> {
        self.with_erased("get_any", type_id, key, |cache| cache.get_any(ctx, key))
    }

    pub fn get_any_with_ttl(
        &self,
        ctx: &Context,
        type_id: &str,
        key: &str,
    ) -> Result<(AnyValue, Option<Duration>)> {
        self.with_erased("get_any_with_ttl", type_id, key, |cache| {
            cache.get_any_with_ttl(ctx, key)
        })
    }

    pub fn get_any_many(&self, ctx: &Context, type_id: &str, keys: &[String]) -> Result<Vec<AnyValue>> {
        self.with_erased("get_any_many", type_id, &keys.join(","), |cache| {
            cache.get_any_many(ctx, keys)
        })
    }

    pub fn get_any_all(&self, ctx: &Context, type_id: &str) -> Result<HashMap<String, AnyValue>> {
        self.with_erased("get_any_all", type_id, "", |cache| cache.get_any_all(ctx))
    }

    pub fn set_any(&self, ctx: &Context, type_id: &str, key: &str, value: AnyValue) -> Result<()> {
        self.with_erased("set_any", type_id, key, |cache| cache.set_any(ctx, key, value))
    }

    pub fn register_any(&self, ctx: &Context, type_id: &str, key: &str, value: AnyValue) -> Result<()> {
        self.with_erased("register_any", type_id, key, |cache| {
            cache.register_any(ctx, key, value)
        })
    }

    pub fn delete_any(&self, ctx: &Context, type_id: &str, key: &str) -> Result<()> {
        self.with_erased("delete_any", type_id, key, |cache| cache.delete(ctx, key))
    }

    pub fn clear_any(&self, ctx: &Context, type_id: &str) -> Result<()> {
        self.with_erased("clear_any", type_id, "", |cache| cache.clear(ctx))
    }

    pub fn get_json(&self, ctx: &Context, type_id: &str, key: &str) -> Result<Value> {
        self.with_erased("get_json", type_id, key, |cache| cache.get_json(ctx, key))
    }

    pub fn set_json(&self, ctx: &Context, type_id: &str, key: &str, value: Value) -> Result<()> {
        self.with_erased("set_json", type_id, key, |cache| cache.set_json(ctx, key, value))
    }

    pub fn register_json(&self, ctx: &Context, type_id: &str, key: &str, value: Value) -> Result<()> {
        self.with_erased("register_json", type_id, key, |cache| {
            cache.register_json(ctx, key, value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::TypeIdentifier;
    use crate::store::{MapStore, MokaStore};

    #[derive(Clone, Debug, PartialEq)]
    struct Widget(u32);

    impl Declared for Widget {
        fn type_identifier() -> TypeIdentifier {
            TypeIdentifier::new::<Self>("tests", "Widget")
        }

        fn description() -> Option<String> {
            Some("a widget".into())
        }
    }

    #[derive(Clone)]
    struct Impostor;

    impl Declared for Impostor {
        fn type_identifier() -> TypeIdentifier {
            TypeIdentifier::new::<Self>("tests", "Widget")
        }
    }

    #[test]
    fn test_register_type_seeds_default_tag() {
        let registry = TypeRegistry::new();
        registry.register_type::<Widget>(TypeOptions::new()).unwrap();
        let entry = registry.get_type::<Widget>().unwrap();
        assert_eq!(entry.tags(), vec![String::new()]);
        assert_eq!(entry.description(), "a widget");
        assert!(registry.get_type_by_id("tests:Widget").is_some());
    }

    #[test]
    fn test_merge_adds_new_tags_and_overrides_metadata() {
        let registry = TypeRegistry::new();
        let ctx = Context::background();
        registry.register_type::<Widget>(TypeOptions::new()).unwrap();
        registry.set(&ctx, "a", Widget(1)).unwrap();
        registry
            .register_type::<Widget>(
                TypeOptions::new()
                    .description("updated")
                    .cache("hot", InstanceCache::new(MokaStore::new())),
            )
            .unwrap();
        let entry = registry.get_type::<Widget>().unwrap();
        assert_eq!(entry.tags(), vec!["".to_string(), "hot".to_string()]);
        assert_eq!(entry.description(), "updated");
        assert_eq!(registry.get::<Widget>(&ctx, "a").unwrap(), Widget(1));
    }

    #[test]
    fn test_merge_conflict_changes_nothing() {
        let registry = TypeRegistry::new();
        registry
            .register_type::<Widget>(TypeOptions::new().cache("hot", InstanceCache::default()))
            .unwrap();
        let err = registry
            .register_type::<Widget>(
                TypeOptions::new()
                    .description("ignored")
                    .cache("cold", InstanceCache::default())
                    .cache("hot", InstanceCache::new(MokaStore::new())),
            )
            .unwrap_err();
        assert!(err.is_already_exists());
        let entry = registry.get_type::<Widget>().unwrap();
        assert_eq!(entry.tags(), vec!["".to_string(), "hot".to_string()]);
        assert_eq!(entry.description(), "a widget");
        assert_eq!(entry.cache("hot").unwrap().store_type(), "map");
    }

    #[test]
    fn test_set_type_replaces_entry() {
        let registry = TypeRegistry::new();
        let ctx = Context::background();
        registry
            .register_type::<Widget>(TypeOptions::new().cache("hot", InstanceCache::default()))
            .unwrap();
        registry.tagged("hot").set(&ctx, "a", Widget(1)).unwrap();
        registry.set_type::<Widget>(TypeOptions::new()).unwrap();
        assert_eq!(registry.get_type::<Widget>().unwrap().tags(), vec![String::new()]);
        assert!(registry.tagged("hot").get::<Widget>(&ctx, "a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_identifier_collision() {
        let registry = TypeRegistry::new();
        registry.register_type::<Widget>(TypeOptions::new()).unwrap();
        let err = registry.register_type::<Impostor>(TypeOptions::new()).unwrap_err();
        assert!(matches!(err, RegistryError::IdentifierCollision { .. }));
        assert!(registry.get_type::<Impostor>().is_none());
        let err = registry.set_type::<Impostor>(TypeOptions::new()).unwrap_err();
        assert!(matches!(err, RegistryError::IdentifierCollision { .. }));
    }

    #[test]
    fn test_unregistered_type_is_not_found() {
        let registry = TypeRegistry::new();
        let err = registry.get::<Widget>(&Context::background(), "a").unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_key_not_found());
        assert!(matches!(err.root(), RegistryError::TypeNotFound { .. }));
        let err = registry
            .get_any(&Context::background(), "tests:Nope", "a")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_errors_carry_context() {
        let registry = TypeRegistry::new();
        registry.register_type::<Widget>(TypeOptions::new()).unwrap();
        let err = registry
            .tagged("t")
            .get::<Widget>(&Context::background(), "missing")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("get tests:Widget[t] \"missing\""), "{message}");
    }

    #[test]
    fn test_erased_access_by_string() {
        let registry = TypeRegistry::new();
        let ctx = Context::background();
        registry
            .register_type::<i64>(TypeOptions::new().cache("", InstanceCache::new(MapStore::new())))
            .unwrap();
        registry.set_any(&ctx, "i64", "a", Box::new(5i64)).unwrap();
        let err = registry.set_any(&ctx, "i64", "b", Box::new(5u8)).unwrap_err();
        assert!(err.is_invalid_cache_kind());
        registry.register_json(&ctx, "i64", "b", serde_json::json!(6)).unwrap();
        assert_eq!(registry.get_json(&ctx, "i64", "b").unwrap(), serde_json::json!(6));
        assert_eq!(registry.get::<i64>(&ctx, "a").unwrap(), 5);
        assert_eq!(registry.get_any_all(&ctx, "i64").unwrap().len(), 2);
        registry.delete_any(&ctx, "i64", "a").unwrap();
        assert_eq!(registry.get_any_many(&ctx, "i64", &["b".to_string()]).unwrap().len(), 1);
        registry.clear_any(&ctx, "i64").unwrap();
        assert!(registry.get_all::<i64>(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_reset_forgets_types() {
        let registry = TypeRegistry::new();
        registry.register_type::<Widget>(TypeOptions::new()).unwrap();
        registry.reset();
        assert!(registry.types().is_empty());
        assert!(registry.get_type_by_id("tests:Widget").is_none());
    }
}
