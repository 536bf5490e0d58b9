//! The process-wide registry.
//!
//! Created lazily on first use and never replaced; [`reset`] empties it for
//! test isolation. `Ref`, `RefAttr` and `Reg` resolve against this instance.
//! The `must_*` variants panic on failure and are meant for startup code
//! that cannot continue without the value.

use super::{TypeEntry, TypeOptions, TypeRegistry};
use crate::context::Context;
use crate::error::Result;
use crate::identity::Declared;
use crate::provider::Provider;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};

static GLOBAL: LazyLock<Arc<TypeRegistry>> = LazyLock::new(|| Arc::new(TypeRegistry::new()));

/// Shared handle to the process-wide registry.
pub fn global() -> Arc<TypeRegistry> {
    Arc::clone(&GLOBAL)
}

/// Register `T` in the process-wide registry, merging new tags if present.
pub fn register_type<T: Declared>(options: TypeOptions<T>) -> Result<()> {
    GLOBAL.register_type(options)
}

/// Replace the process-wide entry for `T`.
pub fn set_type<T: Declared>(options: TypeOptions<T>) -> Result<()> {
    GLOBAL.set_type(options)
}

/// The process-wide entry for `T`, if registered.
pub fn get_type<T: Declared>() -> Option<Arc<TypeEntry>> {
    GLOBAL.get_type::<T>()
}

/// Look a process-wide entry up by its string identifier.
pub fn get_type_by_id(type_id: &str) -> Option<Arc<TypeEntry>> {
    GLOBAL.get_type_by_id(type_id)
}

/// Snapshot of every process-wide entry.
pub fn types() -> BTreeMap<String, Arc<TypeEntry>> {
    GLOBAL.types()
}

/// Set the provider used by later opt-in registrations.
pub fn set_provider(provider: Option<Arc<dyn Provider>>) {
    GLOBAL.set_provider(provider)
}

/// Get `key` from the default tag of `T`.
pub fn get<T: Declared>(ctx: &Context, key: &str) -> Result<T> {
    GLOBAL.get(ctx, key)
}

/// Get several keys in order, failing on the first error.
pub fn get_many<T: Declared>(ctx: &Context, keys: &[&str]) -> Result<Vec<T>> {
    GLOBAL.get_many(ctx, keys)
}

/// Every stored value of `T` under the default tag.
pub fn get_all<T: Declared>(ctx: &Context) -> Result<HashMap<String, T>> {
    GLOBAL.get_all(ctx)
}

/// Insert `value` unless `key` is taken.
pub fn register<T: Declared>(ctx: &Context, key: &str, value: T) -> Result<()> {
    GLOBAL.register(ctx, key, value)
}

/// Insert or overwrite `key`.
pub fn set<T: Declared>(ctx: &Context, key: &str, value: T) -> Result<()> {
    GLOBAL.set(ctx, key, value)
}

/// Remove `key`; removing an absent key succeeds.
pub fn delete<T: Declared>(ctx: &Context, key: &str) -> Result<()> {
    GLOBAL.delete::<T>(ctx, key)
}

/// Remove every value of `T` under the default tag.
pub fn clear<T: Declared>(ctx: &Context) -> Result<()> {
    GLOBAL.clear::<T>(ctx)
}

/// Empty the process-wide registry.
pub fn reset() {
    GLOBAL.reset()
}

/// [`register_type`], panicking on failure.
pub fn must_register_type<T: Declared>(options: TypeOptions<T>) {
    if let Err(err) = register_type(options) {
        panic!("register_type failed: {err}");
    }
}

/// [`get`], panicking on failure.
pub fn must_get<T: Declared>(ctx: &Context, key: &str) -> T {
    match get(ctx, key) {
        Ok(value) => value,
        Err(err) => panic!("get failed: {err}"),
    }
}

/// [`register`], panicking on failure.
pub fn must_register<T: Declared>(ctx: &Context, key: &str, value: T) {
    if let Err(err) = register(ctx, key, value) {
        panic!("register failed: {err}");
    }
}

/// [`set`], panicking on failure.
pub fn must_set<T: Declared>(ctx: &Context, key: &str, value: T) {
    if let Err(err) = set(ctx, key, value) {
        panic!("set failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::TypeIdentifier;

    #[derive(Clone, Debug, PartialEq)]
    struct GlobalOnly(u8);

    impl Declared for GlobalOnly {
        fn type_identifier() -> TypeIdentifier {
            TypeIdentifier::new::<Self>("global_tests", "GlobalOnly")
        }
    }

    #[test]
    fn test_global_round_trip() {
        let ctx = Context::background();
        must_register_type::<GlobalOnly>(TypeOptions::new());
        must_set(&ctx, "a", GlobalOnly(1));
        assert_eq!(must_get::<GlobalOnly>(&ctx, "a"), GlobalOnly(1));
        assert!(Arc::ptr_eq(&global(), &global()));
        assert!(get_type_by_id("global_tests:GlobalOnly").is_some());
    }

    /// Declares its dependencies and capabilities by reading the registry.
    #[derive(Clone, Debug, PartialEq)]
    struct Introspective(usize);

    impl Declared for Introspective {
        fn type_identifier() -> TypeIdentifier {
            TypeIdentifier::new::<Self>("global_tests", "Introspective")
        }

        fn dependencies() -> Option<Vec<String>> {
            Some(types().into_keys().filter(|id| id.starts_with("global_tests:")).collect())
        }

        fn capabilities() -> crate::Capabilities<Self> {
            let tags = get_type::<Self>().map(|entry| entry.tags().len()).unwrap_or(0);
            crate::Capabilities::new().with_default(move || Introspective(tags))
        }
    }

    #[test]
    fn test_hooks_may_read_the_registry() {
        let (done, finished) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            register_type::<Introspective>(TypeOptions::new()).unwrap();
            let ctx = Context::background();
            let value = global().tagged("fresh").get::<Introspective>(&ctx, "a").unwrap();
            done.send(value).unwrap();
        });
        let value = finished
            .recv_timeout(std::time::Duration::from_secs(3))
            .expect("registration blocked on the registry lock");
        assert_eq!(value, Introspective(1));
        assert!(get_type::<Introspective>().is_some());
    }

    #[test]
    #[should_panic(expected = "get failed")]
    fn test_must_get_panics_on_missing_key() {
        must_register_type::<GlobalOnly>(TypeOptions::new());
        let _ = must_get::<GlobalOnly>(&Context::background(), "never-set");
    }
}
