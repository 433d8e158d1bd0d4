//! Error types for imgsearch.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! encoder, storage and query errors. Every failure propagates to the caller;
//! nothing in the workspace retries on its own.

use std::fmt;
use thiserror::Error;

/// Category of a storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// The database could not be opened or reached
    Connectivity,
    /// A constraint (primary key, unique, foreign key, check) was violated
    Constraint,
    /// A vector does not have the collection's dimension
    DimensionMismatch,
    /// The collection does not exist (never created, or dropped)
    MissingCollection,
    /// Any other statement failure
    Query,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageErrorKind::Connectivity => "connectivity",
            StorageErrorKind::Constraint => "constraint",
            StorageErrorKind::DimensionMismatch => "dimension mismatch",
            StorageErrorKind::MissingCollection => "missing collection",
            StorageErrorKind::Query => "query",
        };
        f.write_str(name)
    }
}

/// Unified error type for imgsearch.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The pretrained model could not be loaded or reached
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Malformed encoder input (e.g. a corrupt image, an empty batch)
    #[error("Input error: {0}")]
    Input(String),

    /// The encoder produced an unusable result
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Storage engine errors
    #[error("Storage error ({kind}): {message}")]
    Storage {
        kind: StorageErrorKind,
        message: String,
    },

    /// Top-K must be a positive integer
    #[error("Invalid k: {0} (must be greater than zero)")]
    InvalidK(i64),

    /// Malformed metadata filter
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build a storage error of the given kind.
    pub fn storage(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        AppError::Storage {
            kind,
            message: message.into(),
        }
    }

    /// Storage error kind, if this is a storage error.
    pub fn storage_kind(&self) -> Option<StorageErrorKind> {
        match self {
            AppError::Storage { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True for failures raised by the encoder stage.
    pub fn is_encoding_failure(&self) -> bool {
        matches!(
            self,
            AppError::ModelUnavailable(_) | AppError::Input(_) | AppError::Encoding(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = AppError::storage(StorageErrorKind::Constraint, "UNIQUE failed");
        assert_eq!(err.to_string(), "Storage error (constraint): UNIQUE failed");
        assert_eq!(err.storage_kind(), Some(StorageErrorKind::Constraint));
    }

    #[test]
    fn test_encoding_failure_grouping() {
        assert!(AppError::Input("corrupt".into()).is_encoding_failure());
        assert!(AppError::ModelUnavailable("down".into()).is_encoding_failure());
        assert!(AppError::Encoding("bad".into()).is_encoding_failure());
        assert!(!AppError::InvalidK(0).is_encoding_failure());
        assert_eq!(AppError::InvalidK(0).storage_kind(), None);
    }
}
