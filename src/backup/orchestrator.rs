//! Full-backup orchestration
//!
//! Runs every component against a fresh staging directory, packages the
//! result, tears staging down and persists exactly one record per run.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::archive::Archiver;
use super::components::{standard_components, ComponentBackuper};
use super::exporter::StateExporter;
use super::record::{BackupRecord, ComponentKind, ComponentResult};
use super::registry::BackupRegistry;
use crate::config::{BackupLayout, SourceLayout};

/// Creates full backups
pub struct BackupOrchestrator {
    registry: BackupRegistry,
    archiver: Archiver,
    components: Vec<Box<dyn ComponentBackuper>>,
}

impl BackupOrchestrator {
    /// An orchestrator running the six standard components over `sources`
    pub fn new(
        layout: BackupLayout,
        sources: &SourceLayout,
        exporter: Option<Box<dyn StateExporter>>,
    ) -> Self {
        Self::with_components(layout, standard_components(sources, exporter))
    }

    /// An orchestrator running an explicit component list, in order
    pub fn with_components(
        layout: BackupLayout,
        components: Vec<Box<dyn ComponentBackuper>>,
    ) -> Self {
        Self {
            registry: BackupRegistry::new(layout.clone()),
            archiver: Archiver::new(layout),
            components,
        }
    }

    pub fn registry(&self) -> &BackupRegistry {
        &self.registry
    }

    /// Create a full backup
    ///
    /// Always returns a fully-formed record. Failures are reported through
    /// `success` and `errors`; staging never outlives this call.
    pub fn create_full_backup(&self, include_media: bool) -> BackupRecord {
        self.create_backup_at(include_media, Utc::now())
    }

    pub(crate) fn create_backup_at(
        &self,
        include_media: bool,
        started_at: DateTime<Utc>,
    ) -> BackupRecord {
        let mut record = BackupRecord::begin(started_at);
        let layout = self.registry.layout();
        let staging = layout.staging_dir(&record.name);

        if let Err(e) = fs::create_dir(&staging) {
            let message = format!(
                "Failed to create staging directory {}: {}",
                staging.display(),
                e
            );
            error!("Error creating backup: {}", message);
            record.errors.push(message);
            record.success = false;

            // The name belongs to the run that owns the existing directory
            if e.kind() != ErrorKind::AlreadyExists {
                self.persist(&mut record);
            }
            return record;
        }

        self.run_components(&staging, include_media, &mut record);
        record.total_size_bytes = record
            .components
            .iter()
            .map(ComponentResult::total_size_bytes)
            .sum();

        match self.archiver.create_archive(&staging, &record.name) {
            Ok(artifact) => {
                record.artifact_size_bytes = fs::metadata(&artifact).ok().map(|m| m.len());
                record.artifact_path = Some(artifact.display().to_string());
                record.success = record.errors.is_empty();
            }
            Err(e) => {
                error!("Error archiving backup {}: {}", record.name, e);
                record.errors.push(format!("Failed to create archive: {}", e));
                record.success = false;
                let _ = fs::remove_file(layout.artifact_path(&record.name));
            }
        }

        tear_down_staging(&staging, &mut record);
        self.persist(&mut record);

        if record.success {
            info!("Backup created: {}", record.name);
        }
        record
    }

    /// Run the components in order, recording every outcome
    fn run_components(&self, staging: &Path, include_media: bool, record: &mut BackupRecord) {
        for component in &self.components {
            let kind = component.kind();
            if kind == ComponentKind::Media && !include_media {
                continue;
            }

            match component.back_up(staging) {
                Ok(result) => {
                    if !result.success {
                        warn!("Component {} failed: {}", kind, result.errors.join("; "));
                    }
                    record.components.push(result);
                }
                Err(e) => {
                    let message = format!("Component {} aborted: {}", kind, e);
                    error!("{}", message);
                    let mut result = ComponentResult::new(kind);
                    result.fail(e.to_string());
                    record.components.push(result);
                    record.errors.push(message);
                }
            }
        }
    }

    /// Save the record; a record that cannot be saved takes its artifact with it
    fn persist(&self, record: &mut BackupRecord) {
        if let Err(e) = self.registry.save(record) {
            error!("Failed to save backup record {}: {}", record.name, e);
            record.errors.push(format!("Failed to save backup record: {}", e));
            record.success = false;
            if let Some(artifact) = record.artifact_path.take() {
                let _ = fs::remove_file(artifact);
            }
            record.artifact_size_bytes = None;
        }
    }
}

/// Remove the staging directory; a leftover tree fails the run
fn tear_down_staging(staging: &Path, record: &mut BackupRecord) {
    if let Err(e) = fs::remove_dir_all(staging) {
        warn!("Failed to remove staging directory {}: {}", staging.display(), e);
        record
            .errors
            .push(format!("Failed to remove staging directory: {}", e));
        record.success = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::archive::list_members;
    use crate::error::{ArchivistError, ArchivistResult};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct BytesExporter(&'static [u8]);

    impl StateExporter for BytesExporter {
        fn extension(&self) -> &str {
            "json"
        }

        fn export(&self, out: &mut dyn Write) -> ArchivistResult<()> {
            out.write_all(self.0)?;
            Ok(())
        }
    }

    struct ExplodingComponent;

    impl ComponentBackuper for ExplodingComponent {
        fn kind(&self) -> ComponentKind {
            ComponentKind::Logs
        }

        fn back_up(&self, _staging_root: &Path) -> ArchivistResult<ComponentResult> {
            Err(ArchivistError::Io("disk vanished".into()))
        }
    }

    /// App root with a single 10-byte config file and nothing else
    fn create_test_env() -> (TempDir, BackupLayout, SourceLayout) {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("app");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join("settings.cfg"), b"0123456789").unwrap();

        let mut sources = SourceLayout::rooted_at(&app);
        sources.config_files = vec![PathBuf::from("settings.cfg")];
        sources.logs_dir = Some(PathBuf::from("logs"));
        sources.media_root = Some(PathBuf::from("media"));
        sources.templates_dir = Some(PathBuf::from("templates"));
        sources.static_dir = Some(PathBuf::from("static"));

        let layout = BackupLayout::new(temp.path().join("backups"));
        layout.ensure_root().unwrap();
        (temp, layout, sources)
    }

    fn staging_dirs(layout: &BackupLayout) -> usize {
        fs::read_dir(layout.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .count()
    }

    #[test]
    fn test_minimal_backup_without_media() {
        let (_temp, layout, sources) = create_test_env();
        let orchestrator =
            BackupOrchestrator::new(layout.clone(), &sources, Some(Box::new(BytesExporter(b"{}"))));

        let record = orchestrator.create_full_backup(false);

        assert!(record.success, "errors: {:?}", record.errors);
        assert_eq!(record.components.len(), 5);
        assert!(record.component(ComponentKind::Media).is_none());
        assert_eq!(record.total_size_bytes, 12);

        let artifact = PathBuf::from(record.artifact_path.as_ref().unwrap());
        assert!(artifact.is_file());
        assert_eq!(
            record.artifact_size_bytes,
            Some(fs::metadata(&artifact).unwrap().len())
        );
        assert_eq!(
            list_members(&artifact).unwrap(),
            vec!["config/settings.cfg", "state/data.json"]
        );

        // Staging is gone and exactly one record was written
        assert_eq!(staging_dirs(&layout), 0);
        let saved = orchestrator.registry().get(&record.name).unwrap().unwrap();
        assert_eq!(saved, record);
    }

    #[test]
    fn test_media_included_with_zero_files() {
        let (_temp, layout, sources) = create_test_env();
        let orchestrator =
            BackupOrchestrator::new(layout, &sources, Some(Box::new(BytesExporter(b"{}"))));

        let record = orchestrator.create_full_backup(true);

        let kinds: Vec<ComponentKind> = record.components.iter().map(|c| c.name).collect();
        assert_eq!(kinds, ComponentKind::ALL.to_vec());
        let media = record.component(ComponentKind::Media).unwrap();
        assert!(media.success);
        assert!(media.files.is_empty());
    }

    #[test]
    fn test_state_failure_does_not_fail_run() {
        let (_temp, layout, sources) = create_test_env();
        let orchestrator = BackupOrchestrator::new(layout, &sources, None);

        let record = orchestrator.create_full_backup(false);

        assert!(record.success);
        assert!(!record.component(ComponentKind::State).unwrap().success);
        assert_eq!(record.total_size_bytes, 10);
    }

    #[test]
    fn test_unexpected_component_error_is_recorded_and_run_continues() {
        let (_temp, layout, sources) = create_test_env();
        let mut components = standard_components(&sources, Some(Box::new(BytesExporter(b"{}"))));
        components[2] = Box::new(ExplodingComponent);
        let orchestrator = BackupOrchestrator::with_components(layout.clone(), components);

        let record = orchestrator.create_full_backup(true);

        assert!(!record.success);
        assert_eq!(record.errors.len(), 1);
        assert!(record.errors[0].contains("disk vanished"));
        // Later components still ran and the artifact was still produced
        assert_eq!(record.components.len(), 6);
        assert!(record.component(ComponentKind::StaticAssets).is_some());
        assert!(record.artifact_path.is_some());
        assert_eq!(staging_dirs(&layout), 0);
        assert!(orchestrator.registry().get(&record.name).unwrap().is_some());
    }

    #[test]
    fn test_staging_collision_fails_cleanly() {
        let (_temp, layout, sources) = create_test_env();
        let orchestrator =
            BackupOrchestrator::new(layout.clone(), &sources, Some(Box::new(BytesExporter(b"{}"))));
        let started_at = Utc::now();

        let first = orchestrator.create_backup_at(false, started_at);
        assert!(first.success);

        // Another run still staging under the same name owns that directory
        let name = first.name.clone();
        fs::create_dir(layout.staging_dir(&name)).unwrap();
        fs::write(layout.staging_dir(&name).join("owner"), b"other run").unwrap();

        let second = orchestrator.create_backup_at(false, started_at);

        assert_eq!(second.name, name);
        assert!(!second.success);
        assert!(second.artifact_path.is_none());
        assert!(layout.staging_dir(&name).join("owner").exists());
        // The first run's record and artifact are untouched
        let saved = orchestrator.registry().get(&name).unwrap().unwrap();
        assert_eq!(saved, first);
        assert!(layout.artifact_path(&name).is_file());
    }

    #[test]
    fn test_archive_failure_yields_failed_record() {
        let (_temp, layout, sources) = create_test_env();
        let orchestrator =
            BackupOrchestrator::new(layout.clone(), &sources, Some(Box::new(BytesExporter(b"{}"))));
        let started_at = Utc::now();

        // A directory squatting on the artifact path makes packaging fail
        let name = crate::backup::record::backup_name(started_at);
        fs::create_dir(layout.artifact_path(&name)).unwrap();

        let record = orchestrator.create_backup_at(false, started_at);

        assert!(!record.success);
        assert!(record.artifact_path.is_none());
        assert!(record.artifact_size_bytes.is_none());
        assert!(record.errors.iter().any(|e| e.contains("archive")));
        assert!(!layout.staging_dir(&name).exists());
        let saved = orchestrator.registry().get(&name).unwrap().unwrap();
        assert!(!saved.success);
    }

    #[test]
    fn test_staging_teardown_failure_fails_run() {
        let (temp, _layout, _sources) = create_test_env();
        let staging = temp.path().join("backups/already_gone");

        let mut record = BackupRecord::begin(Utc::now());
        record.success = true;
        tear_down_staging(&staging, &mut record);

        assert!(!record.success);
        assert_eq!(record.errors.len(), 1);
        assert!(record.errors[0].contains("Failed to remove staging directory"));
    }
}
