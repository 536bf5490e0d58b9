//! Pluggable dependency-injection provider.
//!
//! When a registration opts in with
//! [`TypeOptions::use_provider`](crate::TypeOptions::use_provider) and the
//! registry has a provider configured, the default cache for that type
//! resolves misses through [`Provider::invoke`]. The registry never depends
//! on a concrete container; [`Constructors`] is a minimal map-of-constructors provider.

use crate::capabilities::AnyValue;
use crate::error::{RegistryError, Result};
use crate::identity::{identifier_of, Declared, TypeIdentifier};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Resolves a requested type to a value.
pub trait Provider: Send + Sync {
    /// Produce a value of the requested type, boxed as `AnyValue`.
    ///
    /// The returned box must hold exactly the requested type.
    fn invoke(&self, requested: &TypeIdentifier) -> Result<AnyValue>;
}

type Constructor = Arc<dyn Fn() -> Result<AnyValue> + Send + Sync>;

/// A provider backed by one constructor per type.
#[derive(Default)]
pub struct Constructors {
    constructors: RwLock<HashMap<TypeId, Constructor>>,
}

impl Constructors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constructor for `T`, replacing any previous one.
    pub fn provide<T, F>(&self, constructor: F)
    where
        T: Declared,
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        let erased: Constructor = Arc::new(move || constructor().map(|v| Box::new(v) as AnyValue));
        self.constructors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identifier_of::<T>().type_id(), erased);
        debug!("Provided constructor for {}", identifier_of::<T>());
    }
}

impl Provider for Constructors {
    fn invoke(&self, requested: &TypeIdentifier) -> Result<AnyValue> {
        let constructor = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&requested.type_id())
            .cloned()
            .ok_or_else(|| RegistryError::Load {
                message: format!("no constructor provided for {}", requested),
                source: None,
            })?;
        constructor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_provided_constructor() {
        let provider = Constructors::new();
        provider.provide::<String, _>(|| Ok("built".to_string()));
        let value = provider.invoke(&identifier_of::<String>()).unwrap();
        assert_eq!(*value.downcast::<String>().unwrap(), "built");
    }

    #[test]
    fn test_invoke_missing_constructor() {
        let provider = Constructors::new();
        let err = provider.invoke(&identifier_of::<u64>()).unwrap_err();
        assert!(matches!(err, RegistryError::Load { .. }));
    }
}
