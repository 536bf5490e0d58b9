//! Optional per-type capabilities.
//!
//! A declared type advertises what it can do through [`Capabilities`]: load
//! an instance by key, load a key-parameterized default, produce a fixed
//! default, or convert to and from JSON. The registry inspects these once,
//! at registration time, to pick a default cache and to expose a codec to
//! type-erased callers.

use crate::context::Context;
use crate::error::{RegistryError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// A type-erased instance value.
pub type AnyValue = Box<dyn Any + Send + Sync>;

/// Fallback function invoked on a cache miss.
pub type Loader<T> = Arc<dyn Fn(&Context, &str) -> Result<T> + Send + Sync>;

type DefaultFn<T> = Arc<dyn Fn() -> T + Send + Sync>;
type EncodeFn<T> = Arc<dyn Fn(&T) -> Result<Value> + Send + Sync>;
type DecodeFn<T> = Arc<dyn Fn(Value) -> Result<T> + Send + Sync>;

/// Conversion between `T` and `serde_json::Value`.
pub struct JsonCodec<T> {
    encode: EncodeFn<T>,
    decode: DecodeFn<T>,
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self {
            encode: Arc::clone(&self.encode),
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<T> std::fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

fn json_shape_error(expected: &str, got: &Value) -> RegistryError {
    RegistryError::Json {
        message: format!("expected {}, got {}", expected, got),
        source: None,
    }
}

impl<T: Serialize + DeserializeOwned + 'static> JsonCodec<T> {
    /// Codec backed by the type's serde implementations.
    pub fn serde() -> Self {
        Self {
            encode: Arc::new(|value: &T| Ok(serde_json::to_value(value)?)),
            decode: Arc::new(|value: Value| Ok(serde_json::from_value(value)?)),
        }
    }
}

impl<T: 'static> JsonCodec<T> {
    pub fn new<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&T) -> Result<Value> + Send + Sync + 'static,
        D: Fn(Value) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    pub fn encode(&self, value: &T) -> Result<Value> {
        (self.encode)(value)
    }

    pub fn decode(&self, value: Value) -> Result<T> {
        (self.decode)(value)
    }

    /// Lift the codec through a transparent wrapper such as `Arc<T>`.
    pub fn map<U: 'static>(self, wrap: fn(T) -> U, unwrap: fn(&U) -> &T) -> JsonCodec<U> {
        let encode = self.encode;
        let decode = self.decode;
        JsonCodec {
            encode: Arc::new(move |value: &U| encode(unwrap(value))),
            decode: Arc::new(move |value: Value| decode(value).map(wrap)),
        }
    }

    /// Codec for `Vec<T>` as a JSON array.
    pub fn vec(self) -> JsonCodec<Vec<T>> {
        let encode = self.encode;
        let decode = self.decode;
        JsonCodec {
            encode: Arc::new(move |items: &Vec<T>| {
                let values = items.iter().map(|item| encode(item)).collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(values))
            }),
            decode: Arc::new(move |value: Value| match value {
                Value::Array(items) => items.into_iter().map(|item| decode(item)).collect(),
                other => Err(json_shape_error("array", &other)),
            }),
        }
    }

    /// Codec for `Option<T>`, with `None` as JSON `null`.
    pub fn option(self) -> JsonCodec<Option<T>> {
        let encode = self.encode;
        let decode = self.decode;
        JsonCodec {
            encode: Arc::new(move |value: &Option<T>| match value {
                Some(inner) => encode(inner),
                None => Ok(Value::Null),
            }),
            decode: Arc::new(move |value: Value| match value {
                Value::Null => Ok(None),
                other => decode(other).map(Some),
            }),
        }
    }

    /// Codec for `HashMap<K, T>` as a JSON object.
    ///
    /// Keys that do not encode to a JSON string are stored as their JSON text
    /// and parsed back on decode.
    pub fn map_of<K>(self, keys: JsonCodec<K>) -> JsonCodec<HashMap<K, T>>
    where
        K: Eq + Hash + 'static,
    {
        let encode = self.encode;
        let decode = self.decode;
        let encode_key = keys.encode;
        let decode_key = keys.decode;
        JsonCodec {
            encode: Arc::new(move |map: &HashMap<K, T>| {
                let mut object = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    let key = match encode_key(key)? {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    object.insert(key, encode(value)?);
                }
                Ok(Value::Object(object))
            }),
            decode: Arc::new(move |value: Value| match value {
                Value::Object(object) => object
                    .into_iter()
                    .map(|(key, value)| -> Result<(K, T)> {
                        let key = match decode_key(Value::String(key.clone())) {
                            Ok(key) => key,
                            Err(_) => decode_key(serde_json::from_str(&key)?)?,
                        };
                        Ok((key, decode(value)?))
                    })
                    .collect(),
                other => Err(json_shape_error("object", &other)),
            }),
        }
    }
}

/// Capabilities a declared type exposes to the registry.
///
/// ```
/// use typereg::{Capabilities, Context};
///
/// let caps = Capabilities::<String>::new()
///     .with_load(|_ctx: &Context, key: &str| Ok(format!("loaded:{key}")));
/// assert!(caps.load().is_some());
/// assert!(caps.default_value().is_none());
/// ```
pub struct Capabilities<T> {
    load: Option<Loader<T>>,
    load_default: Option<Loader<T>>,
    default: Option<DefaultFn<T>>,
    codec: Option<JsonCodec<T>>,
}

impl<T> Default for Capabilities<T> {
    fn default() -> Self {
        Self {
            load: None,
            load_default: None,
            default: None,
            codec: None,
        }
    }
}

impl<T> Clone for Capabilities<T> {
    fn clone(&self) -> Self {
        Self {
            load: self.load.clone(),
            load_default: self.load_default.clone(),
            default: self.default.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<T: 'static> Capabilities<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an instance by key.
    pub fn with_load<F>(mut self, load: F) -> Self
    where
        F: Fn(&Context, &str) -> Result<T> + Send + Sync + 'static,
    {
        self.load = Some(Arc::new(load));
        self
    }

    /// Load a default instance, parameterized by key.
    pub fn with_load_default<F>(mut self, load: F) -> Self
    where
        F: Fn(&Context, &str) -> Result<T> + Send + Sync + 'static,
    {
        self.load_default = Some(Arc::new(load));
        self
    }

    /// A key-independent fixed default.
    pub fn with_default<F>(mut self, default: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(default));
        self
    }

    pub fn with_codec(mut self, codec: JsonCodec<T>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn load(&self) -> Option<&Loader<T>> {
        self.load.as_ref()
    }

    pub fn load_default(&self) -> Option<&Loader<T>> {
        self.load_default.as_ref()
    }

    pub fn default_value(&self) -> Option<T> {
        self.default.as_ref().map(|f| f())
    }

    pub(crate) fn default_fn(&self) -> Option<&DefaultFn<T>> {
        self.default.as_ref()
    }

    pub fn codec(&self) -> Option<&JsonCodec<T>> {
        self.codec.as_ref()
    }

    pub fn into_codec(self) -> Option<JsonCodec<T>> {
        self.codec
    }

    /// Lift every capability through a transparent wrapper such as `Arc<T>`.
    pub fn map<U: 'static>(self, wrap: fn(T) -> U, unwrap: fn(&U) -> &T) -> Capabilities<U> {
        let lift = |loader: Loader<T>| -> Loader<U> {
            Arc::new(move |ctx: &Context, key: &str| loader(ctx, key).map(wrap))
        };
        Capabilities {
            load: self.load.map(lift),
            load_default: self.load_default.map(lift),
            default: self.default.map(|default| -> DefaultFn<U> {
                Arc::new(move || wrap(default()))
            }),
            codec: self.codec.map(|codec| codec.map(wrap, unwrap)),
        }
    }
}

impl<T: Serialize + DeserializeOwned + 'static> Capabilities<T> {
    /// Use the type's serde implementations as its JSON codec.
    pub fn with_json(self) -> Self {
        self.with_codec(JsonCodec::serde())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_codec() {
        let codec = JsonCodec::<Vec<u32>>::serde();
        let value = codec.encode(&vec![1, 2]).unwrap();
        assert_eq!(value, serde_json::json!([1, 2]));
        assert_eq!(codec.decode(value).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_vec_codec_rejects_non_array() {
        let codec = JsonCodec::<u8>::serde().vec();
        assert!(codec.decode(serde_json::json!({"a": 1})).is_err());
    }

    #[test]
    fn test_map_codec_with_numeric_keys() {
        let codec = JsonCodec::<String>::serde().map_of(JsonCodec::<i32>::serde());
        let mut map = HashMap::new();
        map.insert(7, "seven".to_string());
        let value = codec.encode(&map).unwrap();
        assert_eq!(value, serde_json::json!({"7": "seven"}));
        assert_eq!(codec.decode(value).unwrap(), map);
    }

    #[test]
    fn test_option_codec_null() {
        let codec = JsonCodec::<bool>::serde().option();
        assert_eq!(codec.encode(&None).unwrap(), Value::Null);
        assert_eq!(codec.decode(Value::Bool(true)).unwrap(), Some(true));
    }

    #[test]
    fn test_capabilities_map_through_arc() {
        fn unwrap(value: &Arc<String>) -> &String {
            value
        }
        let caps = Capabilities::<String>::new()
            .with_default(|| "fixed".to_string())
            .with_json()
            .map(Arc::new, unwrap);
        assert_eq!(caps.default_value().unwrap().as_str(), "fixed");
        let codec = caps.codec().unwrap();
        assert_eq!(
            codec.encode(&Arc::new("x".to_string())).unwrap(),
            Value::String("x".into())
        );
    }
}
