//! Path management for Archivist
//!
//! Resolves the base directory holding settings and the audit log, and names
//! every file the engine places under a backup root.
//!
//! ## Path Resolution Order
//!
//! 1. `ARCHIVIST_HOME` environment variable (if set)
//! 2. The platform data directory (`~/.local/share/archivist` on Linux,
//!    `~/Library/Application Support/archivist` on macOS, `%APPDATA%\archivist` on Windows)

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::ArchivistError;

/// Environment variable overriding the base directory
pub const HOME_ENV: &str = "ARCHIVIST_HOME";

/// File extension of backup artifacts
pub const ARTIFACT_EXTENSION: &str = "zip";

/// Suffix of per-backup metadata documents
pub const RECORD_SUFFIX: &str = "_info.json";

/// Manages the paths used by the Archivist binary itself
#[derive(Debug, Clone)]
pub struct ArchivistPaths {
    /// Base directory for settings, audit log and the default backup root
    base_dir: PathBuf,
}

impl ArchivistPaths {
    /// Create a new ArchivistPaths instance
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no home directory can be determined.
    pub fn new() -> Result<Self, ArchivistError> {
        let base_dir = if let Ok(custom) = std::env::var(HOME_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create ArchivistPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the default backup root (<base>/backups/)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }
}

/// Resolve the default base directory path based on platform
fn resolve_default_path() -> Result<PathBuf, ArchivistError> {
    ProjectDirs::from("", "", "archivist")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| ArchivistError::Config("Could not determine a home directory".into()))
}

/// Names every file the engine owns under a backup root
///
/// Artifacts, metadata documents, staging directories and default restore
/// targets all live side by side in the same directory.
#[derive(Debug, Clone)]
pub struct BackupLayout {
    root: PathBuf,
}

impl BackupLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The backup root itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staging directory used while a run is in progress
    pub fn staging_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// `<name>.zip`
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, ARTIFACT_EXTENSION))
    }

    /// `<name>_info.json`
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}{}", name, RECORD_SUFFIX))
    }

    /// Default extraction target, `restore_<name>`
    pub fn restore_dir(&self, name: &str) -> PathBuf {
        self.root.join(format!("restore_{}", name))
    }

    /// Recover a backup name from a metadata document's file name
    pub fn name_from_record_file(file_name: &str) -> Option<&str> {
        file_name
            .strip_suffix(RECORD_SUFFIX)
            .filter(|name| !name.is_empty())
    }

    /// Create the backup root and verify that it is writable
    ///
    /// This is the one failure allowed to abort the whole process.
    pub fn ensure_root(&self) -> Result<(), ArchivistError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            ArchivistError::Config(format!(
                "Failed to create backup root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let marker = self
            .root
            .join(format!(".archivist-write-check-{}", std::process::id()));
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&marker)
            .map_err(|e| {
                ArchivistError::Config(format!(
                    "Backup root {} is not writable: {}",
                    self.root.display(),
                    e
                ))
            })?;
        let _ = fs::remove_file(&marker);

        Ok(())
    }
}
