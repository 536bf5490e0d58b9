//! Store trait and optional capability traits.

use crate::error::Result;
use std::collections::HashMap;
use std::time::Duration;

/// Key-value storage for the instances of one type.
///
/// `get` must report a missing key as
/// [`RegistryError::NotFound`](crate::RegistryError::NotFound); it is the
/// only error that triggers a loader fallback.
pub trait Store<V>: Send + Sync {
    fn get(&self, key: &str) -> Result<V>;

    /// Get a value and its remaining time-to-live (`None` = no expiration).
    fn get_with_ttl(&self, key: &str) -> Result<(V, Option<Duration>)>;

    /// Set a value, overwriting any existing entry with the same key.
    fn set(&self, key: &str, value: V) -> Result<()>;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// Short name of the backend, reported in type listings.
    fn store_type(&self) -> &'static str;

    /// Atomic insert-if-absent, when the backend supports it natively.
    fn as_registrar(&self) -> Option<&dyn Registrar<V>> {
        None
    }

    /// Enumeration of all entries, when the backend supports it.
    fn as_enumerable(&self) -> Option<&dyn Enumerable<V>> {
        None
    }
}

/// Atomic insert-if-absent.
pub trait Registrar<V> {
    /// Insert `value` under `key` unless the key is present, in which case
    /// fail with `AlreadyExists` and leave the store unchanged.
    fn register(&self, key: &str, value: V) -> Result<()>;
}

/// Enumeration of every entry in a store.
pub trait Enumerable<V> {
    fn get_all(&self) -> Result<HashMap<String, V>>;
}
