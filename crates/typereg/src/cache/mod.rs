//! Instance caches.
//!
//! A tagged cache pairs a [`Store`](crate::store::Store) with an optional
//! loader ([`InstanceCache`]), is built by [`default_cache`] when a tag is
//! registered without one, and is reached type-erased through [`AnyCache`].

mod any;
mod instance;
mod policy;

pub use any::{AnyCache, AnyCodec, CacheAdapter};
pub use instance::{InstanceCache, LoadPolicy};
pub use policy::default_cache;
