//! Default cache construction for tags registered without an explicit cache.

use super::instance::InstanceCache;
use crate::capabilities::Loader;
use crate::context::Context;
use crate::error::{RegistryError, Result};
use crate::identity::{identifier_of, Declared};
use crate::provider::Provider;
use crate::store::MapStore;
use std::sync::Arc;
use tracing::debug;

/// Build the default cache for `T`.
///
/// The first capability that applies wins: `load`, then `load_default`,
/// then a fixed `default` (the key is ignored), then `provider` when one is
/// given. Otherwise the result is a plain cache over a fresh [`MapStore`].
/// Every loadable variant stores into a fresh [`MapStore`] as well.
pub fn default_cache<T: Declared>(provider: Option<Arc<dyn Provider>>) -> InstanceCache<T> {
    let id = identifier_of::<T>();
    let caps = T::capabilities();

    let loader: Option<Loader<T>> = if let Some(load) = caps.load() {
        debug!("Default cache for {} loads through its load capability", id);
        Some(Arc::clone(load))
    } else if let Some(load_default) = caps.load_default() {
        debug!("Default cache for {} loads through its load_default capability", id);
        Some(Arc::clone(load_default))
    } else if let Some(default) = caps.default_fn() {
        debug!("Default cache for {} falls back to its fixed default", id);
        let default = Arc::clone(default);
        Some(Arc::new(move |_ctx: &Context, _key: &str| -> Result<T> {
            Ok(default())
        }))
    } else {
        provider.map(|provider| {
            debug!("Default cache for {} resolves through the provider", id);
            provider_loader::<T>(provider)
        })
    };

    let cache = InstanceCache::new(MapStore::new());
    match loader {
        Some(loader) => cache.with_loader(loader),
        None => cache,
    }
}

fn provider_loader<T: Declared>(provider: Arc<dyn Provider>) -> Loader<T> {
    Arc::new(move |ctx: &Context, _key: &str| -> Result<T> {
        ctx.check()?;
        let requested = identifier_of::<T>();
        let value = provider.invoke(&requested)?;
        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| RegistryError::Load {
                message: format!("provider returned a value of the wrong type for {}", requested),
                source: None,
            })
    })
}
