//! Type-erased access to typed caches.
//!
//! [`CacheAdapter<T>`] is instantiated once per concrete type when its cache
//! is attached to a registry entry. Callers that only know a type by its
//! string identifier go through [`AnyCache`]; callers that know `T` downcast
//! the adapter back with [`AnyCache::as_any`] and use the typed cache
//! directly.

use super::instance::InstanceCache;
use crate::capabilities::{AnyValue, JsonCodec};
use crate::context::Context;
use crate::error::{RegistryError, Result};
use crate::identity::{codec_of, identifier_of, Declared, TypeIdentifier};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;

/// JSON conversion of erased values.
pub trait AnyCodec: Send + Sync {
    /// Encode a value; fails with `InvalidCacheKind` if it is not of the
    /// codec's type.
    fn encode_any(&self, value: &(dyn Any + Send + Sync)) -> Result<Value>;

    fn decode_any(&self, value: Value) -> Result<AnyValue>;
}

impl<T: Declared> AnyCodec for JsonCodec<T> {
    fn encode_any(&self, value: &(dyn Any + Send + Sync)) -> Result<Value> {
        match value.downcast_ref::<T>() {
            Some(value) => self.encode(value),
            None => Err(mismatch::<T>()),
        }
    }

    fn decode_any(&self, value: Value) -> Result<AnyValue> {
        Ok(Box::new(self.decode(value)?))
    }
}

fn mismatch<T: Declared>() -> RegistryError {
    let id = identifier_of::<T>();
    RegistryError::InvalidCacheKind {
        type_id: id.to_string(),
        message: format!("value is not a {}", id),
    }
}

/// The erased operations of one tagged cache.
pub trait AnyCache: Send + Sync {
    fn type_identifier(&self) -> &TypeIdentifier;

    fn get_any(&self, ctx: &Context, key: &str) -> Result<AnyValue>;

    fn get_any_with_ttl(&self, ctx: &Context, key: &str) -> Result<(AnyValue, Option<Duration>)>;

    fn get_any_many(&self, ctx: &Context, keys: &[String]) -> Result<Vec<AnyValue>>;

    fn get_any_all(&self, ctx: &Context) -> Result<HashMap<String, AnyValue>>;

    /// Store `value`, which must hold exactly the cache's type.
    fn set_any(&self, ctx: &Context, key: &str, value: AnyValue) -> Result<()>;

    fn register_any(&self, ctx: &Context, key: &str, value: AnyValue) -> Result<()>;

    fn delete(&self, ctx: &Context, key: &str) -> Result<()>;

    fn invalidate(&self, ctx: &Context, keys: &[String]) -> Result<()>;

    fn clear(&self, ctx: &Context) -> Result<()>;

    fn cache_type(&self) -> &'static str;

    fn store_type(&self) -> &'static str;

    /// JSON codec of the cached type, if it declares one.
    fn codec(&self) -> Option<&dyn AnyCodec>;

    fn as_any(&self) -> &dyn Any;

    fn get_json(&self, ctx: &Context, key: &str) -> Result<Value> {
        let value = self.get_any(ctx, key)?;
        self.require_codec()?.encode_any(value.as_ref())
    }

    fn set_json(&self, ctx: &Context, key: &str, value: Value) -> Result<()> {
        let value = self.require_codec()?.decode_any(value)?;
        self.set_any(ctx, key, value)
    }

    fn register_json(&self, ctx: &Context, key: &str, value: Value) -> Result<()> {
        let value = self.require_codec()?.decode_any(value)?;
        self.register_any(ctx, key, value)
    }

    #[doc(hidden)]
    fn require_codec(&self) -> Result<&dyn AnyCodec> {
        self.codec().ok_or_else(|| RegistryError::InvalidCacheKind {
            type_id: self.type_identifier().to_string(),
            message: "type has no JSON codec".into(),
        })
    }
}

/// [`AnyCache`] over an [`InstanceCache<T>`].
pub struct CacheAdapter<T> {
    identifier: TypeIdentifier,
    cache: InstanceCache<T>,
    codec: Option<JsonCodec<T>>,
}

impl<T: Declared> CacheAdapter<T> {
    pub fn new(cache: InstanceCache<T>) -> Self {
        Self {
            identifier: identifier_of::<T>(),
            cache,
            codec: codec_of::<T>(),
        }
    }

    pub fn cache(&self) -> &InstanceCache<T> {
        &self.cache
    }

    fn downcast(&self, value: AnyValue) -> Result<T> {
        value.downcast::<T>().map(|value| *value).map_err(|_| mismatch::<T>())
    }
}

impl<T: Declared> AnyCache for CacheAdapter<T> {
    fn type_identifier(&self) -> &TypeIdentifier {
        &self.identifier
    }

    fn get_any(&self, ctx: &Context, key: &str) -> Result<AnyValue> {
        Ok(Box::new(self.cache.get(ctx, key)?))
    }

    fn get_any_with_ttl(&self, ctx: &Context, key: &str) -> Result<(AnyValue, Option<Duration>)> {
        let (value, ttl) = self.cache.get_with_ttl(ctx, key)?;
        Ok((Box::new(value) as AnyValue, ttl))
    }

    fn get_any_many(&self, ctx: &Context, keys: &[String]) -> Result<Vec<AnyValue>> {
        Ok(self
            .cache
            .get_many(ctx, keys)?
            .into_iter()
            .map(|value| Box::new(value) as AnyValue)
            .collect())
    }

    fn get_any_all(&self, ctx: &Context) -> Result<HashMap<String, AnyValue>> {
        Ok(self
            .cache
            .get_all(ctx)?
            .into_iter()
            .map(|(key, value)| (key, Box::new(value) as AnyValue))
            .collect())
    }

    fn set_any(&self, ctx: &Context, key: &str, value: AnyValue) -> Result<()> {
        let value = self.downcast(value)?;
        self.cache.set(ctx, key, value)
    }

    fn register_any(&self, ctx: &Context, key: &str, value: AnyValue) -> Result<()> {
        let value = self.downcast(value)?;
        self.cache.register(ctx, key, value)
    }

    fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        self.cache.delete(ctx, key)
    }

    fn invalidate(&self, ctx: &Context, keys: &[String]) -> Result<()> {
        self.cache.invalidate(ctx, keys)
    }

    fn clear(&self, ctx: &Context) -> Result<()> {
        self.cache.clear(ctx)
    }

    fn cache_type(&self) -> &'static str {
        self.cache.cache_type()
    }

    fn store_type(&self) -> &'static str {
        self.cache.store_type()
    }

    fn codec(&self) -> Option<&dyn AnyCodec> {
        self.codec.as_ref().map(|codec| codec as &dyn AnyCodec)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MapStore;
    use serde_json::json;

    #[derive(Clone)]
    struct Opaque;

    crate::declare_type!(Opaque);

    fn adapter() -> CacheAdapter<i64> {
        CacheAdapter::new(InstanceCache::new(MapStore::new()))
    }

    #[test]
    fn test_set_any_checks_type() {
        let cache = adapter();
        let ctx = Context::background();
        cache.set_any(&ctx, "a", Box::new(5i64)).unwrap();
        let err = cache.set_any(&ctx, "b", Box::new("five".to_string())).unwrap_err();
        assert!(err.is_invalid_cache_kind());
        let value = cache.get_any(&ctx, "a").unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&5));
    }

    #[test]
    fn test_json_round_trip_through_codec() {
        let cache = adapter();
        let ctx = Context::background();
        cache.set_json(&ctx, "a", json!(12)).unwrap();
        assert_eq!(cache.get_json(&ctx, "a").unwrap(), json!(12));
        assert!(cache.set_json(&ctx, "b", json!("twelve")).is_err());
        assert!(cache.register_json(&ctx, "a", json!(13)).unwrap_err().is_already_exists());
    }

    #[test]
    fn test_missing_codec_is_reported() {
        let cache = CacheAdapter::<Opaque>::new(InstanceCache::default());
        let err = cache.get_json(&Context::background(), "x").unwrap_err();
        assert!(err.is_key_not_found());
        let err = cache.set_json(&Context::background(), "x", json!({})).unwrap_err();
        assert!(err.is_invalid_cache_kind());
    }

    #[test]
    fn test_as_any_recovers_typed_cache() {
        let cache: Box<dyn AnyCache> = Box::new(adapter());
        let typed = cache.as_any().downcast_ref::<CacheAdapter<i64>>().unwrap();
        typed.cache().set(&Context::background(), "k", 3).unwrap();
        assert!(cache.as_any().downcast_ref::<CacheAdapter<u64>>().is_none());
        assert_eq!(cache.get_any_all(&Context::background()).unwrap().len(), 1);
    }
}
