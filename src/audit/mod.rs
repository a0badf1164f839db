//! Audit logging system for Archivist
//!
//! Records operator actions on backups (create, delete, cleanup, restore)
//! in an append-only audit log.
//!
//! # Architecture
//!
//! - `AuditEntry`: a single entry with timestamp, action, the backup it
//!   targets and action-specific details.
//! - `AuditLogger`: writes entries to the audit log file using a
//!   line-delimited JSON format (JSONL).
//!
//! # Example
//!
//! ```rust,ignore
//! use archivist::audit::{AuditAction, AuditEntry, AuditLogger};
//! use serde_json::json;
//!
//! let logger = AuditLogger::new(audit_log_path);
//! logger.log(&AuditEntry::new(
//!     AuditAction::BackupDeleted,
//!     Some("backup_full_20260101_020000_000".to_string()),
//!     json!({}),
//! ))?;
//! ```

mod entry;
mod logger;

pub use entry::{AuditAction, AuditEntry};
pub use logger::AuditLogger;
