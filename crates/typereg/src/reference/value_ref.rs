//! Named references to whole instances in the global registry.

use super::slot::ValueSlot;
use crate::context::Context;
use crate::error::Result;
use crate::identity::{identifier_of, Declared};
use crate::registry::global;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

/// A named reference to an instance of `T` in the global registry.
///
/// Deserializes from a bare name (`"primary"`, always cached) or from
/// `{"name": "primary", "cache": false}`. Deserializing performs one lookup
/// and fails if the instance cannot be resolved. A cached reference keeps
/// that first value; an uncached one queries the registry on every
/// [`value`](Ref::value).
///
/// ```
/// use typereg::{global, Context, Ref, TypeOptions};
///
/// global::register_type::<String>(TypeOptions::new()).unwrap();
/// global::set(&Context::background(), "greeting", "hello".to_string()).unwrap();
///
/// let r: Ref<String> = serde_json::from_str(r#""greeting""#).unwrap();
/// assert_eq!(r.value(&Context::background()).unwrap(), "hello");
/// ```
pub struct Ref<T> {
    name: String,
    slot: ValueSlot<T>,
}

impl<T: Declared> Ref<T> {
    /// An unresolved reference; nothing is looked up until [`value`](Ref::value).
    pub fn new(name: impl Into<String>, cache: bool) -> Self {
        Self {
            name: name.into(),
            slot: ValueSlot::new(cache),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_cached(&self) -> bool {
        self.slot.cache()
    }

    pub fn value(&self, ctx: &Context) -> Result<T> {
        self.slot.get_or_load(|| global::get::<T>(ctx, &self.name))
    }

    /// [`value`](Ref::value), panicking when the reference cannot be resolved.
    pub fn must_value(&self, ctx: &Context) -> T {
        match self.value(ctx) {
            Ok(value) => value,
            Err(err) => panic!("resolve Ref<{}> {:?}: {}", identifier_of::<T>(), self.name, err),
        }
    }
}

impl<T: Clone> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ref")
            .field("name", &self.name)
            .field("cache", &self.slot.cache())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RefRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        cache: bool,
    },
}

impl<'de, T: Declared> Deserialize<'de> for Ref<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (name, cache) = match RefRepr::deserialize(deserializer)? {
            RefRepr::Name(name) => (name, true),
            RefRepr::Full { name, cache } => (name, cache),
        };
        let ctx = super::unmarshal_context();
        let value = global::get::<T>(&ctx, &name).map_err(|err| {
            D::Error::custom(format!("resolve Ref<{}> {:?}: {}", identifier_of::<T>(), name, err))
        })?;
        debug!("Resolved Ref<{}> {:?} (cache={})", identifier_of::<T>(), name, cache);
        Ok(Self {
            name,
            slot: ValueSlot::with_value(cache, Some(value)),
        })
    }
}

impl<T> Serialize for Ref<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RefRepr::Full {
            name: self.name.clone(),
            cache: self.slot.cache(),
        }
        .serialize(serializer)
    }
}
