//! Custom error types for casefile
//!
//! This module defines the error hierarchy for the record store and the
//! backup subsystem using thiserror.

use thiserror::Error;

/// The main error type for casefile operations
#[derive(Error, Debug)]
pub enum CaseError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors, including malformed persisted documents
    #[error("I/O error: {0}")]
    Io(String),

    /// Validation errors for records and arguments
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// In-process lock errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CaseError {
    /// Create a "not found" error for the live data file
    pub fn data_file_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Data file",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for backup snapshots
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for records
    pub fn record_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Record",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is an I/O error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<std::io::Error> for CaseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(format!("Malformed document: {}", err))
    }
}

/// Result type alias for casefile operations
pub type CaseResult<T> = Result<T, CaseError>;
