//! Attribute references: dotted-path lookups into a named instance.

use super::slot::ValueSlot;
use crate::context::Context;
use crate::error::{RegistryError, Result};
use crate::identity::{codec_of, identifier_of, Declared};
use crate::registry::global;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::marker::PhantomData;
use tracing::debug;

/// Walk a dotted `path` through nested JSON objects.
///
/// Pointers are already transparent in the JSON form. A missing field, a
/// `null` on the way or a non-object value fail with
/// [`RegistryError::Structural`].
pub fn get_attr_value<'v>(root: &'v Value, path: &str) -> Result<&'v Value> {
    if path.is_empty() {
        return Err(RegistryError::structural(path, "empty attribute path"));
    }
    let mut current = root;
    for field in path.split('.') {
        current = match current {
            Value::Object(fields) => fields.get(field).ok_or_else(|| {
                RegistryError::structural(path, format!("missing field {:?}", field))
            })?,
            Value::Null => {
                return Err(RegistryError::structural(
                    path,
                    format!("null value before field {:?}", field),
                ))
            }
            other => {
                return Err(RegistryError::structural(
                    path,
                    format!("cannot read field {:?} of non-struct value {}", field, other),
                ))
            }
        };
    }
    Ok(current)
}

/// Resolve `path` on `value`: the type's own accessor first, then the
/// JSON walker over its codec.
pub fn resolve_attr<T, A>(value: &T, path: &str) -> Result<A>
where
    T: Declared,
    A: DeserializeOwned + Send + Sync + 'static,
{
    if let Some(found) = value.get_attr(path) {
        return found?.downcast::<A>().map(|attr| *attr).map_err(|_| {
            RegistryError::structural(path, format!("accessor of {} returned another type", identifier_of::<T>()))
        });
    }
    let codec = codec_of::<T>().ok_or_else(|| {
        RegistryError::structural(
            path,
            format!("{} has no attribute accessor or JSON codec", identifier_of::<T>()),
        )
    })?;
    let encoded = codec.encode(value)?;
    let leaf = get_attr_value(&encoded, path)?;
    serde_json::from_value(leaf.clone())
        .map_err(|err| RegistryError::structural(path, format!("unexpected attribute type: {}", err)))
}

/// A reference to an attribute of a named `T` instance.
///
/// Deserializes from `{"name": ..., "attr": "a.b", "cache": bool}`. The
/// instance and the attribute are resolved once while deserializing; with
/// `cache` set, the attribute value is kept, otherwise every
/// [`value`](RefAttr::value) resolves both again.
pub struct RefAttr<T, A> {
    name: String,
    attr: String,
    slot: ValueSlot<A>,
    _target: PhantomData<fn() -> T>,
}

impl<T, A> RefAttr<T, A>
where
    T: Declared,
    A: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, attr: impl Into<String>, cache: bool) -> Self {
        Self {
            name: name.into(),
            attr: attr.into(),
            slot: ValueSlot::new(cache),
            _target: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn is_cached(&self) -> bool {
        self.slot.cache()
    }

    pub fn value(&self, ctx: &Context) -> Result<A> {
        self.slot.get_or_load(|| {
            let target = global::get::<T>(ctx, &self.name)?;
            resolve_attr(&target, &self.attr)
        })
    }

    pub fn must_value(&self, ctx: &Context) -> A {
        match self.value(ctx) {
            Ok(value) => value,
            Err(err) => panic!(
                "resolve RefAttr<{}> {:?}.{}: {}",
                identifier_of::<T>(),
                self.name,
                self.attr,
                err
            ),
        }
    }
}

impl<T, A: Clone> Clone for RefAttr<T, A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            attr: self.attr.clone(),
            slot: self.slot.clone(),
            _target: PhantomData,
        }
    }
}

impl<T, A> std::fmt::Debug for RefAttr<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefAttr")
            .field("name", &self.name)
            .field("attr", &self.attr)
            .field("cache", &self.slot.cache())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct RefAttrRepr {
    name: String,
    attr: String,
    #[serde(default)]
    cache: bool,
}

impl<'de, T, A> Deserialize<'de> for RefAttr<T, A>
where
    T: Declared,
    A: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let RefAttrRepr { name, attr, cache } = RefAttrRepr::deserialize(deserializer)?;
        let ctx = super::unmarshal_context();
        let resolved = global::get::<T>(&ctx, &name)
            .and_then(|target| resolve_attr::<T, A>(&target, &attr))
            .map_err(|err| {
                D::Error::custom(format!(
                    "resolve RefAttr<{}> {:?}.{}: {}",
                    identifier_of::<T>(),
                    name,
                    attr,
                    err
                ))
            })?;
        debug!("Resolved RefAttr<{}> {:?}.{} (cache={})", identifier_of::<T>(), name, attr, cache);
        Ok(Self {
            name,
            attr,
            slot: ValueSlot::with_value(cache, Some(resolved)),
            _target: PhantomData,
        })
    }
}

impl<T, A> Serialize for RefAttr<T, A> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RefAttrRepr {
            name: self.name.clone(),
            attr: self.attr.clone(),
            cache: self.slot.cache(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_walk_nested_fields() {
        let value = json!({"a": {"b": {"c": 3}}});
        assert_eq!(get_attr_value(&value, "a.b.c").unwrap(), &json!(3));
        assert_eq!(get_attr_value(&value, "a").unwrap(), &json!({"b": {"c": 3}}));
    }

    #[test]
    fn test_walk_failures_are_structural() {
        let value = json!({"a": {"b": null}, "n": 1});
        for path in ["a.x", "a.b.c", "n.m", ""] {
            let err = get_attr_value(&value, path).unwrap_err();
            assert!(err.is_structural(), "{path}: {err}");
        }
    }
}
