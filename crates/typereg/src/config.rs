//! Centralized configuration for the registry.
//!
//! Constants shared by the registry, the default stores and the
//! deserialization-driven references.

use std::time::Duration;

/// Registry-level configuration.
pub struct RegistryConfig;

impl RegistryConfig {
    /// Tag used when a caller does not name one.
    pub const DEFAULT_TAG: &'static str = "";

    /// Deadline for the single lookup performed while deserializing a
    /// `Ref`, `RefAttr` or `Reg`.
    pub const UNMARSHAL_TIMEOUT: Duration = Duration::from_secs(3);
}

/// Names reported by stores and caches through `store_type()` / `cache_type()`.
pub struct CacheConfig;

impl CacheConfig {
    pub const MAP_STORE_TYPE: &'static str = "map";
    pub const MOKA_STORE_TYPE: &'static str = "moka";

    pub const PLAIN_CACHE_TYPE: &'static str = "cache";
    pub const LOADABLE_CACHE_TYPE: &'static str = "loadable";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_reasonable() {
        assert!(RegistryConfig::UNMARSHAL_TIMEOUT > Duration::ZERO);
        assert!(RegistryConfig::UNMARSHAL_TIMEOUT <= Duration::from_secs(30));
    }

    #[test]
    fn test_default_tag_is_empty() {
        assert!(RegistryConfig::DEFAULT_TAG.is_empty());
    }
}
