//! Type registry, per-type entries and the process-wide instance.

mod entry;
pub mod global;
mod type_registry;

pub use entry::{CacheInfo, TypeEntry, TypeInfo};
pub use type_registry::{Tagged, TypeOptions, TypeRegistry};
