//! Custom error types for Archivist
//!
//! This module defines the error hierarchy for the backup engine using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for Archivist operations
#[derive(Error, Debug)]
pub enum ArchivistError {
    /// Configuration-related errors (unresolvable or unwritable roots)
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Invalid operator input (backup names)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Archive packaging or extraction errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// State exporter failures
    #[error("State export error: {0}")]
    Export(String),

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

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// A backup run finished with `success = false`
    #[error("Backup failed: {0}")]
    BackupFailed(String),
}

impl ArchivistError {
    /// Create a "not found" error for backups
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for backup artifacts
    pub fn artifact_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup artifact",
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

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for ArchivistError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ArchivistError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<zip::result::ZipError> for ArchivistError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

impl From<walkdir::Error> for ArchivistError {
    fn from(err: walkdir::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for Archivist operations
pub type ArchivistResult<T> = Result<T, ArchivistError>;
