//! Type identity.
//!
//! Every registered type carries a [`TypeIdentifier`]: its compile-time
//! `TypeId` plus a canonical string used by callers that address types by
//! name (for example an HTTP surface). The string is supplied at the
//! declaration site through the [`Declared`] trait, usually via
//! [`declare_type!`](crate::declare_type).
//!
//! String format: `<namespace>:` (omitted when empty), one `*` per pointer
//! level (`Arc`), then the bare name. Containers spell out their
//! element identifiers and carry no namespace:
//!
//! | Rust type               | identifier                    |
//! |-------------------------|-------------------------------|
//! | `String`                | `String`                      |
//! | `app::Config`           | `app:Config`                  |
//! | `Arc<app::Config>`      | `app:*Config`                 |
//! | `Vec<i64>`              | `[]i64`                       |
//! | `HashMap<String, bool>` | `map[String]bool`             |
//! | `Option<Arc<app::Cfg>>` | `option<app:*Cfg>`            |

use crate::capabilities::{AnyValue, Capabilities, JsonCodec};
use crate::error::Result;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

/// Identity of a declared type.
///
/// Equality and hashing use the `TypeId` only; the string form is derived
/// from it and indexed separately by the registry.
#[derive(Clone)]
pub struct TypeIdentifier {
    id: TypeId,
    namespace: String,
    depth: usize,
    name: String,
    repr: String,
}

impl TypeIdentifier {
    /// Identifier for a named type.
    pub fn new<T: 'static>(namespace: &str, name: &str) -> Self {
        Self::build(TypeId::of::<T>(), namespace, 0, name)
    }

    /// Identifier for a pointer-like wrapper around `inner`.
    pub fn pointer_to<T: 'static>(inner: &TypeIdentifier) -> Self {
        Self::build(TypeId::of::<T>(), &inner.namespace, inner.depth + 1, &inner.name)
    }

    /// Identifier for a container type, spelled out by `shape`.
    pub fn container<T: 'static>(shape: String) -> Self {
        Self::build(TypeId::of::<T>(), "", 0, &shape)
    }

    fn build(id: TypeId, namespace: &str, depth: usize, name: &str) -> Self {
        let stars = "*".repeat(depth);
        let repr = if namespace.is_empty() {
            format!("{}{}", stars, name)
        } else {
            format!("{}:{}{}", namespace, stars, name)
        };
        Self {
            id,
            namespace: namespace.to_string(),
            depth,
            name: name.to_string(),
            repr,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn as_str(&self) -> &str {
        &self.repr
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of pointer levels wrapped around the bare type.
    pub fn pointer_depth(&self) -> usize {
        self.depth
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for TypeIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeIdentifier {}

impl Hash for TypeIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl fmt::Debug for TypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeIdentifier({})", self.repr)
    }
}

/// A type that can be registered.
///
/// Only [`type_identifier`](Declared::type_identifier) is required; the
/// remaining methods are optional capabilities the registry consults when
/// the type is first registered.
pub trait Declared: Clone + Send + Sync + 'static {
    fn type_identifier() -> TypeIdentifier;

    /// Human readable description, used when registration options omit one.
    fn description() -> Option<String> {
        None
    }

    /// String identifiers of the types this one depends on.
    fn dependencies() -> Option<Vec<String>> {
        None
    }

    fn capabilities() -> Capabilities<Self> {
        Capabilities::new()
    }

    /// Attribute accessor used by `RefAttr`.
    ///
    /// Returning `None` means "no accessor", and the generic JSON walker is
    /// used instead.
    fn get_attr(&self, _path: &str) -> Option<Result<AnyValue>> {
        None
    }
}

static IDENTIFIERS: LazyLock<RwLock<HashMap<TypeId, TypeIdentifier>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Identifier of `T`, derived once and memoized.
pub fn identifier_of<T: Declared>() -> TypeIdentifier {
    let id = TypeId::of::<T>();
    if let Some(found) = IDENTIFIERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
    {
        return found.clone();
    }
    let derived = T::type_identifier();
    IDENTIFIERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(id)
        .or_insert(derived)
        .clone()
}

/// Implement [`Declared`] for a type, using the calling module as namespace.
///
/// Append `json` to give the type a serde-backed JSON codec, which enables
/// the type-erased JSON helpers and the generic `RefAttr` walker.
///
/// ```
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Endpoint {
///     url: String,
/// }
///
/// typereg::declare_type!(Endpoint, json);
///
/// let id = typereg::identifier_of::<Endpoint>();
/// assert!(id.as_str().ends_with(":Endpoint"));
/// ```
#[macro_export]
macro_rules! declare_type {
    ($ty:ty) => {
        impl $crate::Declared for $ty {
            fn type_identifier() -> $crate::TypeIdentifier {
                $crate::TypeIdentifier::new::<$ty>(module_path!(), stringify!($ty))
            }
        }
    };
    ($ty:ty, json) => {
        impl $crate::Declared for $ty {
            fn type_identifier() -> $crate::TypeIdentifier {
                $crate::TypeIdentifier::new::<$ty>(module_path!(), stringify!($ty))
            }

            fn capabilities() -> $crate::Capabilities<Self> {
                $crate::Capabilities::new().with_json()
            }
        }
    };
}

macro_rules! builtin {
    ($namespace:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Declared for $ty {
                fn type_identifier() -> TypeIdentifier {
                    TypeIdentifier::new::<$ty>($namespace, stringify!($ty))
                }

                fn capabilities() -> Capabilities<Self> {
                    Capabilities::new().with_json()
                }
            }
        )+
    };
}

builtin!("" => bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String);

impl Declared for serde_json::Value {
    fn type_identifier() -> TypeIdentifier {
        TypeIdentifier::new::<Self>("serde_json", "Value")
    }

    fn capabilities() -> Capabilities<Self> {
        Capabilities::new().with_json()
    }
}

fn deref_arc<T>(value: &Arc<T>) -> &T {
    value
}

impl<T: Declared> Declared for Arc<T> {
    fn type_identifier() -> TypeIdentifier {
        TypeIdentifier::pointer_to::<Self>(&identifier_of::<T>())
    }

    fn description() -> Option<String> {
        T::description()
    }

    fn dependencies() -> Option<Vec<String>> {
        T::dependencies()
    }

    fn capabilities() -> Capabilities<Self> {
        T::capabilities().map(Arc::new, deref_arc::<T>)
    }

    fn get_attr(&self, path: &str) -> Option<Result<AnyValue>> {
        T::get_attr(self, path)
    }
}

impl<T: Declared> Declared for Vec<T> {
    fn type_identifier() -> TypeIdentifier {
        TypeIdentifier::container::<Self>(format!("[]{}", identifier_of::<T>()))
    }

    fn capabilities() -> Capabilities<Self> {
        match T::capabilities().into_codec() {
            Some(codec) => Capabilities::new().with_codec(codec.vec()),
            None => Capabilities::new(),
        }
    }
}

impl<T: Declared> Declared for Option<T> {
    fn type_identifier() -> TypeIdentifier {
        TypeIdentifier::container::<Self>(format!("option<{}>", identifier_of::<T>()))
    }

    fn capabilities() -> Capabilities<Self> {
        match T::capabilities().into_codec() {
            Some(codec) => Capabilities::new().with_codec(codec.option()),
            None => Capabilities::new(),
        }
    }

    fn get_attr(&self, path: &str) -> Option<Result<AnyValue>> {
        self.as_ref().and_then(|inner| inner.get_attr(path))
    }
}

impl<K, V> Declared for HashMap<K, V>
where
    K: Declared + Eq + std::hash::Hash,
    V: Declared,
{
    fn type_identifier() -> TypeIdentifier {
        TypeIdentifier::container::<Self>(format!(
            "map[{}]{}",
            identifier_of::<K>(),
            identifier_of::<V>()
        ))
    }

    fn capabilities() -> Capabilities<Self> {
        match (K::capabilities().into_codec(), V::capabilities().into_codec()) {
            (Some(keys), Some(values)) => Capabilities::new().with_codec(values.map_of(keys)),
            _ => Capabilities::new(),
        }
    }
}

/// Convenience for codecs on builtin scalar types.
pub(crate) fn codec_of<T: Declared>() -> Option<JsonCodec<T>> {
    T::capabilities().into_codec()
}
