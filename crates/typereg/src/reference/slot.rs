//! Cached-or-live value holder behind the reference types.

use crate::error::Result;
use std::sync::{PoisonError, RwLock};

/// Resolved-value slot shared by `Ref` and `RefAttr`.
///
/// With `cache` set, the first successful resolution is kept and returned
/// from then on. Without it, every access resolves again.
pub(crate) struct ValueSlot<T> {
    cache: bool,
    value: RwLock<Option<T>>,
}

impl<T> ValueSlot<T> {
    pub(crate) fn cache(&self) -> bool {
        self.cache
    }
}

impl<T: Clone> ValueSlot<T> {
    pub(crate) fn new(cache: bool) -> Self {
        Self {
            cache,
            value: RwLock::new(None),
        }
    }

    pub(crate) fn with_value(cache: bool, value: Option<T>) -> Self {
        Self {
            cache,
            value: RwLock::new(if cache { value } else { None }),
        }
    }

    pub(crate) fn cached(&self) -> Option<T> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return the cached value, or resolve with `load` and keep the result
    /// when caching is on. Concurrent first resolutions race; the last one
    /// to finish is kept.
    pub(crate) fn get_or_load(&self, load: impl FnOnce() -> Result<T>) -> Result<T> {
        if self.cache {
            if let Some(value) = self.cached() {
                return Ok(value);
            }
        }
        let value = load()?;
        if self.cache {
            *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value.clone());
        }
        Ok(value)
    }
}

impl<T: Clone> Clone for ValueSlot<T> {
    fn clone(&self) -> Self {
        Self::with_value(self.cache, self.cached())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_cached_slot_loads_once() {
        let slot = ValueSlot::new(true);
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        };
        assert_eq!(slot.get_or_load(load).unwrap(), 1);
        assert_eq!(slot.get_or_load(load).unwrap(), 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_uncached_slot_always_loads() {
        let slot = ValueSlot::with_value(false, Some(0));
        assert!(slot.cached().is_none());
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        };
        slot.get_or_load(load).unwrap();
        assert_eq!(slot.get_or_load(load).unwrap(), 2);
    }
}
