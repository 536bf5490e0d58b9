//! HTTP CRUD surface over a [`TypeRegistry`].
//!
//! Only JSON-capable types can be read or written here, and types are never
//! registered implicitly: a request naming an unknown type id is rejected.

mod handler;
mod server;

pub use handler::{ApiError, Instance};
pub use server::{router, start_server, AppState, ServerConfig};

use anyhow::Context as _;
use serde_json::Value;
use std::path::Path;
use tracing::info;
use typereg::{Reg, TypeOptions, TypeRegistry};

/// Register the JSON-capable built-in types so they are reachable by id.
pub fn register_builtin_types(registry: &TypeRegistry) -> typereg::Result<()> {
    registry.register_type::<String>(TypeOptions::new())?;
    registry.register_type::<bool>(TypeOptions::new())?;
    registry.register_type::<i64>(TypeOptions::new())?;
    registry.register_type::<u64>(TypeOptions::new())?;
    registry.register_type::<f64>(TypeOptions::new())?;
    registry.register_type::<Value>(TypeOptions::new())?;
    Ok(())
}

/// Apply a seed file of `[{"name", "value", "action"}]` declarations.
///
/// Values are stored as `serde_json::Value` in the global registry, since
/// that is where [`Reg`] writes. Declarations are applied in file order and
/// loading stops at the first failure; earlier ones stay applied.
pub fn load_seed(path: &Path) -> anyhow::Result<usize> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read seed file {}", path.display()))?;
    let applied: Vec<Reg<Value>> = serde_json::from_str(&contents)
        .with_context(|| format!("apply seed file {}", path.display()))?;
    info!("Applied {} seed declarations from {}", applied.len(), path.display());
    Ok(applied.len())
}
