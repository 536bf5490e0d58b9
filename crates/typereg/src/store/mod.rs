//! Key-value stores backing the per-tag instance caches.
//!
//! A store maps string keys to values of one type. Two implementations ship
//! with the crate and differ only in locking granularity:
//! - [`MapStore`]: a `HashMap` behind a single `RwLock`, with atomic
//!   insert-if-absent and enumeration
//! - [`MokaStore`]: a sharded `mini_moka` cache, with enumeration and an
//!   optional time-to-live

mod map;
mod moka;
mod traits;

pub use map::MapStore;
pub use moka::MokaStore;
pub use traits::{Enumerable, Registrar, Store};
