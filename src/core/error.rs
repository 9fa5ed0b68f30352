//! Error types for the registry service.
//!
//! One crate-wide enum covers every failure kind the service distinguishes.
//! The HTTP adapter maps kinds to statuses in `api::error`; nothing below the
//! adapter inspects messages, only kinds.

use thiserror::Error;

/// Common registry error conditions.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The requested client or client key does not exist.
    #[error("entity not found")]
    EntityNotFound,

    /// Malformed request payload or an out-of-bounds client key.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The client key is already associated with a different client.
    #[error("non-unique client key {key}")]
    NonUniqueClientKey { key: String },

    /// Optimistic retries exhausted; the watched keys kept changing.
    #[error("concurrent updates of the keys {keys:?}")]
    ConcurrentUpdate { keys: Vec<String> },

    /// Transport failure from the key-value store.
    #[error("storage: {message}")]
    Storage { message: String },

    /// Stored bytes could not be decoded.
    #[error("encoding: {message}")]
    Encoding { message: String },
}

impl RegistryError {
    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a NonUniqueClientKey error carrying the offending key.
    pub fn non_unique_key(key: impl Into<String>) -> Self {
        Self::NonUniqueClientKey { key: key.into() }
    }

    /// Create a Storage error from any displayable transport failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }

    /// Check if this error maps to a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound)
    }

    /// Check if this error is the uniqueness conflict on a client key.
    pub fn is_key_conflict(&self) -> bool {
        matches!(self, Self::NonUniqueClientKey { .. })
    }

    /// Check if the caller could succeed by retrying the whole operation.
    ///
    /// Only retry exhaustion qualifies; storage and encoding failures are
    /// never retried inside the core.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ConcurrentUpdate { .. })
    }
}

impl From<redis::RedisError> for RegistryError {
    fn from(err: redis::RedisError) -> Self {
        Self::storage(err)
    }
}

impl From<prost::DecodeError> for RegistryError {
    fn from(err: prost::DecodeError) -> Self {
        Self::Encoding {
            message: err.to_string(),
        }
    }
}

/// Result type using RegistryError.
pub type RegistryResult<T> = Result<T, RegistryError>;
