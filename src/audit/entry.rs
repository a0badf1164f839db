//! Audit entry data structures
//!
//! Defines the operator actions that are audited and the entry format itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backup operations that are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A backup run reported success
    BackupCreated,
    /// An operator removed a backup by name
    BackupDeleted,
    /// Retention cleanup removed at least one backup
    BackupCleanup,
    /// A backup was extracted
    BackupRestored,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::BackupCreated => write!(f, "backup_created"),
            AuditAction::BackupDeleted => write!(f, "backup_deleted"),
            AuditAction::BackupCleanup => write!(f, "backup_cleanup"),
            AuditAction::BackupRestored => write!(f, "backup_restored"),
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the operation occurred (UTC)
    pub timestamp: DateTime<Utc>,

    /// Operation performed
    pub action: AuditAction,

    /// Backup affected, if the action targets a single one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_name: Option<String>,

    /// Action-specific details (sizes, counts, paths)
    #[serde(default)]
    pub details: serde_json::Value,
}

impl AuditEntry {
    /// Create a new audit entry stamped with the current time
    pub fn new(action: AuditAction, backup_name: Option<String>, details: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            backup_name,
            details,
        }
    }

    /// Format the entry for human-readable display
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.action
        );
        if let Some(name) = &self.backup_name {
            output.push(' ');
            output.push_str(name);
        }
        output
    }
}
