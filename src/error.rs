//! Error types for the access-control layer.
//!
//! Decision functions (`can_read`, `can_perform`) never surface these errors for a denial; they
//! are reserved for mutating operations, record validation, storage and configuration failures.

use std::io;
use thiserror::Error;

/// Unified error type for policy resolution, storage and configuration.
#[derive(Error, Debug)]
pub enum AccessError {
    /// The acting identity lacks the role required for a mutating operation
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// A policy record's id does not match the hash of its content
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Attempt to hash or evaluate an incomplete policy record
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// The subsystem was constructed or configured without a required component
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A request guard refused the request
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// An identity could not be parsed or is not a valid ed25519 public key
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Errors raised by the underlying document store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Errors related to serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors related to IO operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<sled::Error> for AccessError {
    fn from(error: sled::Error) -> Self {
        AccessError::Storage(error.to_string())
    }
}

impl From<sled::transaction::TransactionError<AccessError>> for AccessError {
    fn from(error: sled::transaction::TransactionError<AccessError>) -> Self {
        match error {
            sled::transaction::TransactionError::Abort(inner) => inner,
            sled::transaction::TransactionError::Storage(e) => AccessError::Storage(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for AccessError {
    fn from(error: serde_json::Error) -> Self {
        AccessError::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AccessError {
    fn from(error: toml::de::Error) -> Self {
        AccessError::Serialization(error.to_string())
    }
}

pub type AccessResult<T> = Result<T, AccessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_abort_unwraps_inner_error() {
        let err: AccessError = sled::transaction::TransactionError::Abort(
            AccessError::Integrity("bad id".to_string()),
        )
        .into();
        assert!(matches!(err, AccessError::Integrity(msg) if msg == "bad id"));
    }

    #[test]
    fn test_display_includes_category() {
        let err = AccessError::Authorization("actor is not an admin".to_string());
        assert_eq!(err.to_string(), "Authorization error: actor is not an admin");
    }
}
