//! typereg - concurrent type registry with tagged instance caches.
//!
//! Types are declared once (see [`Declared`] and [`declare_type!`]) and
//! registered with a [`TypeRegistry`]. Each registered type owns one or more
//! tagged caches of named instances, backed by a pluggable [`Store`] and
//! optionally a loader that fills misses. Instances can be reached with the
//! static type, or type-erased by the type's string identifier.
//!
//! [`Ref`], [`RefAttr`] and [`Reg`] tie deserialization to the global
//! registry: a configuration document can point at registered instances or
//! register new ones as it is loaded.
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use typereg::{Context, TypeOptions, TypeRegistry};
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! struct Endpoint {
//!     url: String,
//! }
//!
//! typereg::declare_type!(Endpoint, json);
//!
//! let registry = TypeRegistry::new();
//! let ctx = Context::background();
//! registry.register_type::<Endpoint>(TypeOptions::new())?;
//! registry.register(&ctx, "api", Endpoint { url: "http://localhost".into() })?;
//!
//! let type_id = typereg::identifier_of::<Endpoint>().to_string();
//! let json = registry.get_json(&ctx, &type_id, "api")?;
//! assert_eq!(json["url"], "http://localhost");
//! # Ok::<(), typereg::RegistryError>(())
//! ```

pub mod cache;
pub mod capabilities;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod provider;
pub mod reference;
pub mod registry;
pub mod store;

// Re-export commonly used types
pub use cache::{default_cache, AnyCache, AnyCodec, CacheAdapter, InstanceCache, LoadPolicy};
pub use capabilities::{AnyValue, Capabilities, JsonCodec, Loader};
pub use config::{CacheConfig, RegistryConfig};
pub use context::{CancellationToken, Context};
pub use error::{RegistryError, Result};
pub use identity::{identifier_of, Declared, TypeIdentifier};
pub use provider::{Constructors, Provider};
pub use reference::{get_attr_value, Ref, RefAttr, Reg, RegAction};
pub use registry::global;
pub use registry::global::global as global_registry;
pub use registry::{CacheInfo, Tagged, TypeEntry, TypeInfo, TypeOptions, TypeRegistry};
pub use store::{Enumerable, MapStore, MokaStore, Registrar, Store};
