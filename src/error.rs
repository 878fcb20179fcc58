//! Error types for the expiring dictionary
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Dict Error Enum ==
/// Unified error type for the expiring dictionary.
///
/// Expiration and eviction are never reported through this type; they only
/// show up as absent values in later lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DictError {
    /// Invalid `max_len` / `max_age` at construction
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Key absent or expired (strict accessors only)
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Legacy operation that is intentionally not implemented
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}

// == Result Type Alias ==
/// Convenience Result type for the expiring dictionary.
pub type Result<T> = std::result::Result<T, DictError>;
