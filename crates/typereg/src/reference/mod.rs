//! Deserialization-driven references into the global registry.
//!
//! [`Ref`] and [`RefAttr`] resolve a named instance (or one of its
//! attributes) while being deserialized; [`Reg`] writes an instance. Every
//! lookup made during deserialization runs under
//! [`RegistryConfig::UNMARSHAL_TIMEOUT`](crate::config::RegistryConfig::UNMARSHAL_TIMEOUT).

mod attr;
mod reg;
mod slot;
mod value_ref;

pub use attr::{get_attr_value, resolve_attr, RefAttr};
pub use reg::{Reg, RegAction};
pub use value_ref::Ref;

use crate::config::RegistryConfig;
use crate::context::Context;

/// Context for the lookups made while deserializing a reference.
pub(crate) fn unmarshal_context() -> Context {
    Context::with_timeout(RegistryConfig::UNMARSHAL_TIMEOUT)
}
