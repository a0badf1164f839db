//! Backup restoration for Archivist
//!
//! Extracts an artifact into a directory for inspection or manual recovery.
//! Nothing here touches the live application.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use super::archive::extract_archive;
use super::registry::BackupRegistry;
use crate::error::{ArchivistError, ArchivistResult};

/// Handles restoring from backups
pub struct RestoreManager {
    registry: BackupRegistry,
}

impl RestoreManager {
    /// Create a new RestoreManager
    pub fn new(registry: BackupRegistry) -> Self {
        Self { registry }
    }

    /// Extract backup `name` into `target`, or `restore_<name>` under the backup root
    ///
    /// Fails with `NotFound` if the record or its artifact is missing. The
    /// target's existing contents are left in place.
    pub fn restore(&self, name: &str, target: Option<&Path>) -> ArchivistResult<RestoreResult> {
        let record = self
            .registry
            .get(name)?
            .ok_or_else(|| ArchivistError::backup_not_found(name))?;

        // Only the artifact inside the backup root is ever read
        let artifact = self.registry.layout().artifact_path(name);
        if record.artifact_path.is_none() || !artifact.is_file() {
            return Err(ArchivistError::artifact_not_found(name));
        }

        let target_dir = target
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.registry.layout().restore_dir(name));

        let extracted = extract_archive(&artifact, &target_dir)?;
        info!(
            "Backup {} restored to {} ({} files)",
            name,
            target_dir.display(),
            extracted.len()
        );

        Ok(RestoreResult {
            name: name.to_string(),
            target_dir,
            extracted,
        })
    }
}

/// Result of a restore operation
#[derive(Debug, Clone, Serialize)]
pub struct RestoreResult {
    /// Backup that was extracted
    pub name: String,
    /// Directory the members were written under
    pub target_dir: PathBuf,
    /// Member names in archive order
    pub extracted: Vec<String>,
}
