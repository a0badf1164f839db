//! Backup statistics
//!
//! One read-only pass over the registry listing.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::registry::{BackupRegistry, RegistryScan};
use crate::error::ArchivistResult;

/// Aggregate view of a backup root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_backups: usize,
    pub successful_backups: usize,
    pub failed_backups: usize,
    /// Compressed size of artifacts still on disk
    pub total_artifact_size_bytes: u64,
    pub oldest_created_at: Option<DateTime<Utc>>,
    pub newest_created_at: Option<DateTime<Utc>>,
    pub backup_directory: PathBuf,
    /// Record files that could not be parsed
    pub unreadable_records: usize,
}

pub struct StatisticsReporter {
    registry: BackupRegistry,
}

impl StatisticsReporter {
    pub fn new(registry: BackupRegistry) -> Self {
        Self { registry }
    }

    pub fn statistics(&self) -> ArchivistResult<Statistics> {
        Ok(summarize(
            &self.registry.scan()?,
            self.registry.layout().root().to_path_buf(),
        ))
    }
}

fn summarize(scan: &RegistryScan, backup_directory: PathBuf) -> Statistics {
    let mut stats = Statistics {
        total_backups: 0,
        successful_backups: 0,
        failed_backups: 0,
        total_artifact_size_bytes: 0,
        oldest_created_at: None,
        newest_created_at: None,
        backup_directory,
        unreadable_records: scan.unreadable.len(),
    };

    for backup in &scan.backups {
        let record = &backup.record;
        stats.total_backups += 1;
        if record.success {
            stats.successful_backups += 1;
        } else {
            stats.failed_backups += 1;
        }
        if backup.artifact_exists {
            stats.total_artifact_size_bytes += record.artifact_size_bytes.unwrap_or(0);
        }

        let created = record.created_at;
        stats.oldest_created_at = Some(stats.oldest_created_at.map_or(created, |o| o.min(created)));
        stats.newest_created_at = Some(stats.newest_created_at.map_or(created, |n| n.max(created)));
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::record::BackupRecord;
    use crate::config::BackupLayout;
    use chrono::Duration;
    use std::fs;
    use tempfile::TempDir;

    fn saved_record(registry: &BackupRegistry, age: Duration, success: bool) -> BackupRecord {
        let mut record = BackupRecord::begin(Utc::now() - age);
        if success {
            let artifact = registry.layout().artifact_path(&record.name);
            fs::write(&artifact, vec![0u8; 1024]).unwrap();
            record.artifact_path = Some(artifact.display().to_string());
            record.artifact_size_bytes = Some(1024);
        }
        record.success = success;
        registry.save(&record).unwrap();
        record
    }

    #[test]
    fn test_statistics() {
        let temp = TempDir::new().unwrap();
        let layout = BackupLayout::new(temp.path().join("backups"));
        layout.ensure_root().unwrap();
        let registry = BackupRegistry::new(layout.clone());

        let oldest = saved_record(&registry, Duration::days(5), true);
        saved_record(&registry, Duration::days(2), false);
        let gone = saved_record(&registry, Duration::days(1), true);
        let newest = saved_record(&registry, Duration::hours(1), true);
        fs::remove_file(gone.artifact_path.as_ref().unwrap()).unwrap();
        fs::write(layout.record_path("backup_full_torn"), b"{ trunc").unwrap();

        let stats = StatisticsReporter::new(registry).statistics().unwrap();

        assert_eq!(stats.total_backups, 4);
        assert_eq!(stats.successful_backups, 3);
        assert_eq!(stats.failed_backups, 1);
        assert_eq!(stats.total_artifact_size_bytes, 2048);
        assert_eq!(stats.oldest_created_at, Some(oldest.created_at));
        assert_eq!(stats.newest_created_at, Some(newest.created_at));
        assert_eq!(stats.backup_directory, layout.root());
        assert_eq!(stats.unreadable_records, 1);
    }

    #[test]
    fn test_empty_statistics() {
        let temp = TempDir::new().unwrap();
        let registry = BackupRegistry::new(BackupLayout::new(temp.path().join("none")));

        let stats = StatisticsReporter::new(registry).statistics().unwrap();
        assert_eq!(stats.total_backups, 0);
        assert_eq!(stats.total_artifact_size_bytes, 0);
        assert!(stats.oldest_created_at.is_none());
        assert!(stats.newest_created_at.is_none());
        assert_eq!(stats.unreadable_records, 0);
    }
}
