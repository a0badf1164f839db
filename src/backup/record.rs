//! Backup metadata records
//!
//! One `BackupRecord` is produced per run and persisted once as
//! `<name>_info.json`. Component results keep execution order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every generated backup name
pub const NAME_PREFIX: &str = "backup_full_";

/// Kind of backup run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    #[default]
    Full,
}

/// The logical components of a full backup, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Exported records plus migration definitions
    State,
    Config,
    Logs,
    /// User-uploaded media; gated by `include_media`
    Media,
    Templates,
    #[serde(rename = "static")]
    StaticAssets,
}

impl ComponentKind {
    /// All components in execution order
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::State,
        ComponentKind::Config,
        ComponentKind::Logs,
        ComponentKind::Media,
        ComponentKind::Templates,
        ComponentKind::StaticAssets,
    ];

    /// Component identifier, also its top-level directory inside the archive
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::State => "state",
            ComponentKind::Config => "config",
            ComponentKind::Logs => "logs",
            ComponentKind::Media => "media",
            ComponentKind::Templates => "templates",
            ComponentKind::StaticAssets => "static",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single staged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name without directories
    pub name: String,
    /// Size of the staged copy
    pub size_bytes: u64,
    /// Path relative to the staging root, `/`-separated
    pub relative_path: String,
}

/// Outcome of one component backuper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub name: ComponentKind,
    /// False only if the component's own collection step failed
    pub success: bool,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ComponentResult {
    /// A successful result with no files yet
    pub fn new(name: ComponentKind) -> Self {
        Self {
            name,
            success: true,
            files: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Mark the component failed with `error`
    pub fn fail(&mut self, error: impl Into<String>) {
        self.success = false;
        self.errors.push(error.into());
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// Metadata about one backup run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Unique identifier, `backup_full_<timestamp>`
    pub name: String,
    /// Wall-clock time the run started
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub kind: BackupKind,
    /// Attempted components in execution order
    #[serde(default)]
    pub components: Vec<ComponentResult>,
    /// Sum of staged file sizes before compression
    #[serde(default)]
    pub total_size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    /// Compressed size; not comparable with `total_size_bytes`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_size_bytes: Option<u64>,
    pub success: bool,
    /// Orchestration-level failures
    #[serde(default)]
    pub errors: Vec<String>,
}

impl BackupRecord {
    /// Start a record for a run beginning at `created_at`
    pub fn begin(created_at: DateTime<Utc>) -> Self {
        Self {
            name: backup_name(created_at),
            created_at,
            kind: BackupKind::Full,
            components: Vec::new(),
            total_size_bytes: 0,
            artifact_path: None,
            artifact_size_bytes: None,
            success: false,
            errors: Vec::new(),
        }
    }

    /// Look up a component's result
    pub fn component(&self, kind: ComponentKind) -> Option<&ComponentResult> {
        self.components.iter().find(|c| c.name == kind)
    }

    /// Number of staged files across all components
    pub fn file_count(&self) -> usize {
        self.components.iter().map(|c| c.files.len()).sum()
    }
}

/// Generate the backup name for a run starting at `timestamp`
///
/// Millisecond resolution keeps successive runs distinct; the exclusive
/// staging directory catches anything finer.
pub fn backup_name(timestamp: DateTime<Utc>) -> String {
    format!("{}{}", NAME_PREFIX, timestamp.format("%Y%m%d_%H%M%S_%3f"))
}
