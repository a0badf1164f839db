//! Backup registry
//!
//! Durable mapping from backup name to its `BackupRecord`, kept as one
//! `<name>_info.json` document per backup next to the artifacts.

use std::fs;
use std::path::{Component, Path};

use serde::Serialize;
use tracing::{info, warn};

use super::record::BackupRecord;
use crate::config::BackupLayout;
use crate::error::{ArchivistError, ArchivistResult};
use crate::storage::{read_json_required, write_json_new};

/// A record as listed, with the artifact re-checked on disk
#[derive(Debug, Clone, Serialize)]
pub struct ListedBackup {
    #[serde(flatten)]
    pub record: BackupRecord,
    /// False when the artifact was removed out-of-band
    pub artifact_exists: bool,
}

/// Every readable record plus the record documents that failed to parse
#[derive(Debug, Clone, Default)]
pub struct RegistryScan {
    /// Readable records, newest first
    pub backups: Vec<ListedBackup>,
    /// File names of record documents that could not be read
    pub unreadable: Vec<String>,
}

/// Reject names that are not a single plain path component
pub fn validate_name(name: &str) -> ArchivistResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part.to_str() == Some(name) => Ok(()),
        _ => Err(ArchivistError::Validation(format!(
            "Invalid backup name '{}'",
            name
        ))),
    }
}

/// Per-name metadata store under a backup root
#[derive(Debug, Clone)]
pub struct BackupRegistry {
    layout: BackupLayout,
}

impl BackupRegistry {
    pub fn new(layout: BackupLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &BackupLayout {
        &self.layout
    }

    /// Persist a record; an existing record with the same name is never replaced
    pub fn save(&self, record: &BackupRecord) -> ArchivistResult<()> {
        let path = self.layout.record_path(&record.name);
        write_json_new(&path, record).map_err(|e| match e {
            ArchivistError::Duplicate { .. } => ArchivistError::Duplicate {
                entity_type: "Backup record",
                identifier: record.name.clone(),
            },
            other => other,
        })
    }

    /// Read one record by name
    pub fn get(&self, name: &str) -> ArchivistResult<Option<BackupRecord>> {
        validate_name(name)?;
        let path = self.layout.record_path(name);
        if !path.exists() {
            return Ok(None);
        }
        read_json_required(&path).map(Some)
    }

    /// Whether a record or artifact for `name` is present
    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok()
            && (self.layout.record_path(name).exists() || self.layout.artifact_path(name).exists())
    }

    /// All readable records, newest first
    ///
    /// Documents that fail to parse are logged and skipped.
    pub fn list(&self) -> ArchivistResult<Vec<ListedBackup>> {
        Ok(self.scan()?.backups)
    }

    /// Like `list`, also naming the record documents that were skipped
    pub fn scan(&self) -> ArchivistResult<RegistryScan> {
        let root = self.layout.root();
        if !root.exists() {
            return Ok(RegistryScan::default());
        }

        let mut backups = Vec::new();
        let mut unreadable = Vec::new();

        for entry in fs::read_dir(root).map_err(|e| {
            ArchivistError::Io(format!("Failed to read backup directory: {}", e))
        })? {
            let entry = entry.map_err(|e| {
                ArchivistError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            let file_name = entry.file_name().to_string_lossy().to_string();
            let name = match BackupLayout::name_from_record_file(&file_name) {
                Some(name) => name.to_string(),
                None => continue,
            };

            match read_json_required::<BackupRecord, _>(entry.path()) {
                Ok(record) => {
                    let artifact_exists = record.artifact_path.is_some()
                        && self.layout.artifact_path(&name).is_file();
                    backups.push(ListedBackup {
                        record,
                        artifact_exists,
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable backup record {}: {}", file_name, e);
                    unreadable.push(file_name);
                }
            }
        }

        // Sort by date, newest first
        backups.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then_with(|| b.record.name.cmp(&a.record.name))
        });

        unreadable.sort();
        Ok(RegistryScan {
            backups,
            unreadable,
        })
    }

    /// Remove a backup's artifact and record
    ///
    /// Only `<root>/<name>.zip` and `<root>/<name>_info.json` are ever
    /// removed. Returns `Ok(false)` if nothing by that name exists.
    pub fn delete(&self, name: &str) -> ArchivistResult<bool> {
        validate_name(name)?;
        let record_path = self.layout.record_path(name);
        let artifact_path = self.layout.artifact_path(name);

        if let Ok(Some(record)) = self.get(name) {
            if let Some(recorded) = record.artifact_path.as_deref() {
                if Path::new(recorded) != artifact_path {
                    warn!(
                        "Record {} names artifact {}; only {} is removed",
                        name,
                        recorded,
                        artifact_path.display()
                    );
                }
            }
        }

        let removed_artifact = remove_if_present(&artifact_path)?;
        let removed_record = remove_if_present(&record_path)?;

        if removed_artifact || removed_record {
            info!("Backup removed: {}", name);
        }
        Ok(removed_artifact || removed_record)
    }
}

fn remove_if_present(path: &Path) -> ArchivistResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ArchivistError::Io(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn create_test_registry() -> (BackupRegistry, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let layout = BackupLayout::new(temp_dir.path().join("backups"));
        layout.ensure_root().unwrap();
        (BackupRegistry::new(layout), temp_dir)
    }

    fn saved_record(registry: &BackupRegistry, age: Duration) -> BackupRecord {
        let mut record = BackupRecord::begin(Utc::now() - age);
        let artifact = registry.layout().artifact_path(&record.name);
        fs::write(&artifact, b"PK").unwrap();
        record.artifact_path = Some(artifact.display().to_string());
        record.artifact_size_bytes = Some(2);
        record.success = true;
        registry.save(&record).unwrap();
        record
    }

    #[test]
    fn test_save_and_get() {
        let (registry, _temp) = create_test_registry();
        let record = saved_record(&registry, Duration::zero());

        let loaded = registry.get(&record.name).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(registry.exists(&record.name));
        assert!(registry.get("backup_full_unknown").unwrap().is_none());
    }

    #[test]
    fn test_save_refuses_duplicate_name() {
        let (registry, _temp) = create_test_registry();
        let record = saved_record(&registry, Duration::zero());

        let mut clobber = record.clone();
        clobber.success = false;
        let err = registry.save(&clobber).unwrap_err();
        assert!(matches!(err, ArchivistError::Duplicate { .. }));
        assert!(registry.get(&record.name).unwrap().unwrap().success);
    }

    #[test]
    fn test_list_newest_first() {
        let (registry, _temp) = create_test_registry();
        let old = saved_record(&registry, Duration::days(3));
        let new = saved_record(&registry, Duration::hours(1));
        let middle = saved_record(&registry, Duration::days(1));

        let names: Vec<String> = registry
            .list()
            .unwrap()
            .into_iter()
            .map(|b| b.record.name)
            .collect();
        assert_eq!(names, vec![new.name, middle.name, old.name]);
    }

    #[test]
    fn test_list_flags_missing_artifact() {
        let (registry, _temp) = create_test_registry();
        let record = saved_record(&registry, Duration::zero());
        fs::remove_file(record.artifact_path.as_ref().unwrap()).unwrap();

        let listed = registry.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].artifact_exists);
        // Inconsistency is reported, not repaired
        assert!(registry.layout().record_path(&record.name).exists());
    }

    #[test]
    fn test_list_skips_unreadable_records() {
        let (registry, _temp) = create_test_registry();
        saved_record(&registry, Duration::zero());
        fs::write(
            registry.layout().record_path("backup_full_broken"),
            "{ not json",
        )
        .unwrap();
        fs::write(registry.layout().root().join("notes.txt"), "hello").unwrap();

        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_scan_names_unreadable_records() {
        let (registry, _temp) = create_test_registry();
        saved_record(&registry, Duration::zero());
        fs::write(
            registry.layout().record_path("backup_full_broken"),
            "{ not json",
        )
        .unwrap();

        let scan = registry.scan().unwrap();
        assert_eq!(scan.backups.len(), 1);
        assert_eq!(scan.unreadable, vec!["backup_full_broken_info.json"]);
    }

    #[test]
    fn test_names_must_stay_inside_root() {
        let (registry, temp) = create_test_registry();
        let outside = temp.path().join("precious.zip");
        fs::write(&outside, b"keep me").unwrap();

        for name in ["../precious", "a/b", "/etc/passwd", "..", ".", ""] {
            assert!(validate_name(name).is_err(), "{:?} accepted", name);
            assert!(!registry.exists(name));
        }

        let err = registry.delete("../precious").unwrap_err();
        assert!(err.is_validation());
        assert!(registry.get("../precious").unwrap_err().is_validation());
        assert!(outside.exists());
        assert!(validate_name("backup_full_20261014_120000_000").is_ok());
    }

    #[test]
    fn test_delete_ignores_tampered_artifact_path() {
        let (registry, temp) = create_test_registry();
        let outside = temp.path().join("precious.txt");
        fs::write(&outside, b"keep me").unwrap();

        let mut record = BackupRecord::begin(Utc::now());
        let artifact = registry.layout().artifact_path(&record.name);
        fs::write(&artifact, b"PK").unwrap();
        record.artifact_path = Some(outside.display().to_string());
        registry.save(&record).unwrap();

        assert!(registry.delete(&record.name).unwrap());
        assert!(outside.exists());
        assert!(!artifact.exists());
        assert!(!registry.layout().record_path(&record.name).exists());
    }

    #[test]
    fn test_list_without_root() {
        let temp_dir = TempDir::new().unwrap();
        let registry = BackupRegistry::new(BackupLayout::new(temp_dir.path().join("none")));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_both_and_is_idempotent() {
        let (registry, _temp) = create_test_registry();
        let record = saved_record(&registry, Duration::zero());

        assert!(registry.delete(&record.name).unwrap());
        assert!(!registry.layout().record_path(&record.name).exists());
        assert!(!registry.layout().artifact_path(&record.name).exists());

        assert!(!registry.delete(&record.name).unwrap());
        assert!(!registry.delete("backup_full_never").unwrap());
    }

    #[test]
    fn test_listed_json_carries_artifact_exists() {
        let (registry, _temp) = create_test_registry();
        saved_record(&registry, Duration::zero());

        let value = serde_json::to_value(registry.list().unwrap()).unwrap();
        assert_eq!(value[0]["artifact_exists"], true);
        assert!(value[0]["name"].as_str().unwrap().starts_with("backup_full_"));
    }
}
