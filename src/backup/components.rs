//! Component backupers
//!
//! Each component copies one logical part of the application's durable state
//! into its own directory of the staging root and reports a
//! `ComponentResult`. Failures of the component's own collection step are
//! reported inside the result; an `Err` means something outside that
//! contract went wrong and the orchestrator records it as a run error.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use super::collector::{relative_to_root, CollectOptions, Collected, FileCollector};
use super::exporter::StateExporter;
use super::record::{ComponentKind, ComponentResult, FileEntry};
use crate::config::SourceLayout;
use crate::error::{ArchivistError, ArchivistResult};

/// Migration package marker left out of `state/migrations/`
const MIGRATION_PACKAGE_MARKER: &str = "__init__.py";

/// One logical component of a full backup
pub trait ComponentBackuper {
    fn kind(&self) -> ComponentKind;

    /// Copy this component into `staging_root`
    fn back_up(&self, staging_root: &Path) -> ArchivistResult<ComponentResult>;
}

/// Build the six standard components in execution order
pub fn standard_components(
    sources: &SourceLayout,
    exporter: Option<Box<dyn StateExporter>>,
) -> Vec<Box<dyn ComponentBackuper>> {
    vec![
        Box::new(StateBackuper::new(exporter, sources.migrations_path())),
        Box::new(ConfigBackuper::new(
            sources.config_file_paths(),
            sources.app_source_path(),
        )),
        Box::new(LogsBackuper::new(sources.logs_path())),
        Box::new(TreeBackuper::new(ComponentKind::Media, sources.media_path())),
        Box::new(TreeBackuper::new(
            ComponentKind::Templates,
            sources.templates_path(),
        )),
        Box::new(TreeBackuper::new(
            ComponentKind::StaticAssets,
            sources.static_path(),
        )),
    ]
}

/// Record a collection outcome on `result`
fn apply(result: &mut ComponentResult, outcome: ArchivistResult<Collected>) {
    match outcome {
        Ok(collected) => {
            result.files.extend(collected.files);
            result.errors.extend(collected.errors);
        }
        Err(e) => {
            error!("Error backing up {}: {}", result.name, e);
            result.fail(e.to_string());
        }
    }
}

/// Persisted records plus schema/migration definitions
pub struct StateBackuper {
    exporter: Option<Box<dyn StateExporter>>,
    migrations_dir: Option<PathBuf>,
}

impl StateBackuper {
    pub fn new(exporter: Option<Box<dyn StateExporter>>, migrations_dir: Option<PathBuf>) -> Self {
        Self {
            exporter,
            migrations_dir,
        }
    }

    fn write_dump(
        &self,
        exporter: &dyn StateExporter,
        staging_root: &Path,
        state_dir: &Path,
    ) -> ArchivistResult<FileEntry> {
        let dump_name = format!("data.{}", exporter.extension());
        let dump_path = state_dir.join(&dump_name);

        let result = (|| -> ArchivistResult<u64> {
            let file = File::create(&dump_path)?;
            let mut writer = BufWriter::new(file);
            exporter.export(&mut writer)?;
            writer.flush()?;
            Ok(fs::metadata(&dump_path)?.len())
        })();

        match result {
            Ok(size_bytes) => Ok(FileEntry {
                name: dump_name,
                size_bytes,
                relative_path: relative_to_root(staging_root, &dump_path),
            }),
            Err(e) => {
                // A partial dump must not end up in the archive
                let _ = fs::remove_file(&dump_path);
                Err(e)
            }
        }
    }
}

impl ComponentBackuper for StateBackuper {
    fn kind(&self) -> ComponentKind {
        ComponentKind::State
    }

    fn back_up(&self, staging_root: &Path) -> ArchivistResult<ComponentResult> {
        let mut result = ComponentResult::new(self.kind());
        let state_dir = staging_root.join(ComponentKind::State.as_str());
        fs::create_dir_all(&state_dir).map_err(|e| {
            ArchivistError::Io(format!("Failed to create {}: {}", state_dir.display(), e))
        })?;

        let Some(exporter) = self.exporter.as_deref() else {
            result.fail("No state exporter configured");
            return Ok(result);
        };

        match self.write_dump(exporter, staging_root, &state_dir) {
            Ok(entry) => result.files.push(entry),
            Err(e) => {
                error!("Error exporting state: {}", e);
                result.fail(e.to_string());
                return Ok(result);
            }
        }

        if let Some(migrations) = &self.migrations_dir {
            let collector = FileCollector::new(staging_root);
            let options = CollectOptions::flat().skipping(MIGRATION_PACKAGE_MARKER);
            apply(
                &mut result,
                collector.collect(migrations, Path::new("state/migrations"), &options),
            );
        }

        Ok(result)
    }
}

/// Allow-listed configuration files plus the application source tree
pub struct ConfigBackuper {
    config_files: Vec<PathBuf>,
    app_source_dir: Option<PathBuf>,
}

impl ConfigBackuper {
    pub fn new(config_files: Vec<PathBuf>, app_source_dir: Option<PathBuf>) -> Self {
        Self {
            config_files,
            app_source_dir,
        }
    }
}

impl ComponentBackuper for ConfigBackuper {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Config
    }

    fn back_up(&self, staging_root: &Path) -> ArchivistResult<ComponentResult> {
        let mut result = ComponentResult::new(self.kind());
        let collector = FileCollector::new(staging_root);
        let config_dir = Path::new(ComponentKind::Config.as_str());
        let options = CollectOptions::default();

        for file in &self.config_files {
            if !file.is_file() {
                debug!("Config file {} not present", file.display());
                continue;
            }
            let Some(file_name) = file.file_name() else {
                continue;
            };
            apply(
                &mut result,
                collector.collect(file, &config_dir.join(file_name), &options),
            );
        }

        if let Some(source_dir) = &self.app_source_dir {
            let dir_name = source_dir
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("src"));
            apply(
                &mut result,
                collector.collect(source_dir, &config_dir.join(dir_name), &options),
            );
        }

        Ok(result)
    }
}

/// Files directly under the logs directory
pub struct LogsBackuper {
    logs_dir: Option<PathBuf>,
}

impl LogsBackuper {
    pub fn new(logs_dir: Option<PathBuf>) -> Self {
        Self { logs_dir }
    }
}

impl ComponentBackuper for LogsBackuper {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Logs
    }

    fn back_up(&self, staging_root: &Path) -> ArchivistResult<ComponentResult> {
        let mut result = ComponentResult::new(self.kind());
        if let Some(logs_dir) = &self.logs_dir {
            let collector = FileCollector::new(staging_root);
            apply(
                &mut result,
                collector.collect(
                    logs_dir,
                    Path::new(ComponentKind::Logs.as_str()),
                    &CollectOptions::flat(),
                ),
            );
        }
        Ok(result)
    }
}

/// Recursive copy of one optional tree (media, templates, static assets)
pub struct TreeBackuper {
    kind: ComponentKind,
    source: Option<PathBuf>,
}

impl TreeBackuper {
    pub fn new(kind: ComponentKind, source: Option<PathBuf>) -> Self {
        Self { kind, source }
    }
}

impl ComponentBackuper for TreeBackuper {
    fn kind(&self) -> ComponentKind {
        self.kind
    }

    fn back_up(&self, staging_root: &Path) -> ArchivistResult<ComponentResult> {
        let mut result = ComponentResult::new(self.kind);
        if let Some(source) = &self.source {
            let collector = FileCollector::new(staging_root);
            apply(
                &mut result,
                collector.collect(
                    source,
                    Path::new(self.kind.as_str()),
                    &CollectOptions::default(),
                ),
            );
        }
        Ok(result)
    }
}
