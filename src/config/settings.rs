//! User settings for Archivist
//!
//! Describes where the application's durable state lives, how to export its
//! persisted records, where backups go, and how long they are kept.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths::ArchivistPaths;
use crate::error::ArchivistError;

/// Retention policy applied by `cleanup`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Maximum number of backups to keep
    #[serde(default = "default_max_count")]
    pub max_count: usize,
    /// Backups older than this many days are expired
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
            retention_days: default_retention_days(),
        }
    }
}

/// External command producing the serialized record dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateExportSettings {
    /// Program followed by its arguments
    pub command: Vec<String>,

    /// Extension of the dump file (`data.<extension>`)
    #[serde(default = "default_export_extension")]
    pub extension: String,
}

/// Filesystem roots of the application being backed up
///
/// Every root is optional. Relative paths are resolved against `app_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLayout {
    /// Application base directory
    #[serde(default = "default_app_root")]
    pub app_root: PathBuf,

    /// Top-level configuration files copied into `config/`
    #[serde(default = "default_config_files")]
    pub config_files: Vec<PathBuf>,

    /// Application source tree copied into `config/<dir name>/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_source_dir: Option<PathBuf>,

    /// Schema/migration definitions copied into `state/migrations/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            app_root: default_app_root(),
            config_files: default_config_files(),
            app_source_dir: None,
            migrations_dir: None,
            logs_dir: None,
            media_root: None,
            templates_dir: None,
            static_dir: None,
        }
    }
}

impl SourceLayout {
    /// A layout rooted at `app_root` with no optional roots configured
    pub fn rooted_at(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            ..Self::default()
        }
    }

    /// Resolve a configured path against the application root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.app_root.join(path)
        }
    }

    fn resolve_opt(&self, path: &Option<PathBuf>) -> Option<PathBuf> {
        path.as_deref().map(|p| self.resolve(p))
    }

    pub fn config_file_paths(&self) -> Vec<PathBuf> {
        self.config_files.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn app_source_path(&self) -> Option<PathBuf> {
        self.resolve_opt(&self.app_source_dir)
    }

    pub fn migrations_path(&self) -> Option<PathBuf> {
        self.resolve_opt(&self.migrations_dir)
    }

    pub fn logs_path(&self) -> Option<PathBuf> {
        self.resolve_opt(&self.logs_dir)
    }

    pub fn media_path(&self) -> Option<PathBuf> {
        self.resolve_opt(&self.media_root)
    }

    pub fn templates_path(&self) -> Option<PathBuf> {
        self.resolve_opt(&self.templates_dir)
    }

    pub fn static_path(&self) -> Option<PathBuf> {
        self.resolve_opt(&self.static_dir)
    }
}

/// User settings for Archivist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Backup root; defaults to `<base>/backups`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    /// Log filter used when neither RUST_LOG nor --log-level is given
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Application roots to back up
    #[serde(default)]
    pub sources: SourceLayout,

    /// State exporter; the State component fails without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_export: Option<StateExportSettings>,

    /// Retention policy
    #[serde(default)]
    pub retention: RetentionPolicy,
}

fn default_schema_version() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_count() -> usize {
    10
}

fn default_retention_days() -> u32 {
    30
}

fn default_export_extension() -> String {
    "json".to_string()
}

fn default_app_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_config_files() -> Vec<PathBuf> {
    ["settings.py", "urls.py", "wsgi.py", "asgi.py", "requirements.txt"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup_dir: None,
            log_level: default_log_level(),
            sources: SourceLayout::default(),
            state_export: None,
            retention: RetentionPolicy::default(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit file, or defaults if it doesn't exist
    pub fn load_from(settings_path: &Path) -> Result<Self, ArchivistError> {
        if !settings_path.exists() {
            // Don't save yet - let caller decide when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(settings_path)
            .map_err(|e| ArchivistError::Io(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| ArchivistError::Config(format!("Failed to parse settings file: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, settings_path: &Path) -> Result<(), ArchivistError> {
        crate::storage::write_json_atomic(settings_path, self)
            .map_err(|e| ArchivistError::Config(format!("Failed to write settings file: {}", e)))
    }

    /// The effective backup root
    pub fn backup_root(&self, paths: &ArchivistPaths) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| paths.backup_dir())
    }
}
