//! Error types for the type registry.
//!
//! Every fallible operation returns [`RegistryError`]. Absence (of a type or of
//! a key) is kept distinguishable from every other failure because loader
//! fallback and `register` react only to true absence.

use std::time::Duration;
use thiserror::Error;

/// Main error type for registry, cache and store operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    // Absence
    #[error("type not registered: {type_id}")]
    TypeNotFound { type_id: String },

    #[error("value not found in {store} store: {key}")]
    NotFound { store: String, key: String },

    // Conflicts
    #[error("already exists: {what}")]
    AlreadyExists { what: String },

    #[error("type identifier {id} already bound to a different type")]
    IdentifierCollision { id: String },

    // Capability mismatches
    #[error("invalid cache kind for {type_id}: {message}")]
    InvalidCacheKind { type_id: String, message: String },

    // Attribute path resolution
    #[error("attribute {path}: {message}")]
    Structural { path: String, message: String },

    // Loader and provider failures
    #[error("load failed: {message}")]
    Load {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Deadlines
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("{operation} {type_id}[{tag}] {key:?}: {source}")]
    Context {
        operation: &'static str,
        type_id: String,
        tag: String,
        key: String,
        #[source]
        source: Box<RegistryError>,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl RegistryError {
    /// Create a store-miss error.
    pub fn not_found(store: impl Into<String>, key: impl Into<String>) -> Self {
        RegistryError::NotFound {
            store: store.into(),
            key: key.into(),
        }
    }

    /// Create a structural (attribute path) error.
    pub fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::Structural {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a loader failure from any error type.
    pub fn load<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RegistryError::Load {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Wrap this error with the operation, type, tag and key it happened on.
    pub fn context(
        self,
        operation: &'static str,
        type_id: impl Into<String>,
        tag: &str,
        key: &str,
    ) -> Self {
        RegistryError::Context {
            operation,
            type_id: type_id.into(),
            tag: tag.to_string(),
            key: key.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through any `Context` wrapping.
    pub fn root(&self) -> &RegistryError {
        match self {
            RegistryError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when a type or a key is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            RegistryError::NotFound { .. } | RegistryError::TypeNotFound { .. }
        )
    }

    /// True only for a store key miss, the one condition loaders react to.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self.root(), RegistryError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self.root(), RegistryError::AlreadyExists { .. })
    }

    pub fn is_structural(&self) -> bool {
        matches!(self.root(), RegistryError::Structural { .. })
    }

    pub fn is_invalid_cache_kind(&self) -> bool {
        matches!(self.root(), RegistryError::InvalidCacheKind { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::not_found("map", "alpha");
        assert_eq!(err.to_string(), "value not found in map store: alpha");
    }

    #[test]
    fn test_context_keeps_classification() {
        let err = RegistryError::not_found("map", "alpha").context("get", "string", "", "alpha");
        assert!(err.is_not_found());
        assert!(err.is_key_not_found());
        assert!(!err.is_already_exists());
        assert!(err.to_string().starts_with("get string[] \"alpha\""));
    }

    #[test]
    fn test_type_not_found_is_not_a_key_miss() {
        let err = RegistryError::TypeNotFound {
            type_id: "i64".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_key_not_found());
    }

    #[test]
    fn test_json_conversion() {
        let err: RegistryError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(matches!(err, RegistryError::Json { .. }));
    }
}
