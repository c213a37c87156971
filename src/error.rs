//! Custom error types for FinanceTracker
//!
//! This module defines the error hierarchy for the ledger using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// Reasons a backup file is rejected before its signature is even considered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackupValidationError {
    /// The `version` field holds a schema version this build cannot read
    #[error("unsupported backup version: {0}")]
    UnsupportedVersion(String),

    /// A required field is absent (`context` names the record it belongs to)
    #[error("missing field `{field}` in {context}")]
    MissingField { context: String, field: String },

    /// The file is not JSON or a field has the wrong shape
    #[error("malformed backup: {0}")]
    Malformed(String),
}

/// The main error type for FinanceTracker operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backup schema validation errors
    #[error("Backup validation error: {0}")]
    Backup(#[from] BackupValidationError),

    /// Signature mismatch on a backup
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Operation conflicts with existing data (e.g. deleting a referenced category)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Row is generated by the engine and cannot be edited directly
    #[error("Transaction is read-only: {0}")]
    ReadOnly(String),

    /// Backup retention cap reached
    #[error("Backup limit reached: at most {limit} backups may be kept, delete one first")]
    BackupLimit { limit: usize },

    /// User cancelled a file selection
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Create a "not found" error for transactions
    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for categories
    pub fn category_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for subscriptions
    pub fn subscription_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Subscription",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for backups
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Shorthand for a missing-field backup error
    pub fn missing_field(context: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Backup(BackupValidationError::MissingField {
            context: context.into(),
            field: field.into(),
        })
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error (model or backup schema)
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Backup(_))
    }

    /// Check if this is a signature mismatch
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }

    /// Check if this is a conflict with existing data
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Duplicate { .. })
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for FinanceTracker operations
pub type LedgerResult<T> = Result<T, LedgerError>;
