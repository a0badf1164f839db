//! Backup engine for Archivist
//!
//! Produces point-in-time, self-contained snapshots of an application's
//! durable state, keeps metadata about them, and prunes, extracts and
//! summarizes them.
//!
//! # Architecture
//!
//! - `BackupOrchestrator`: runs the components into a staging directory,
//!   packages it and records the outcome
//! - `BackupRegistry`: one `<name>_info.json` record per backup
//! - `RetentionManager`: count and age caps, with a shared dry-run path
//! - `RestoreManager`: extracts an artifact for inspection
//! - `StatisticsReporter`: aggregate counts and sizes
//!
//! # Artifact Format
//!
//! One zip archive per backup, `<name>.zip`, holding the staged tree:
//! - `state/`: the exported record dump and migration definitions
//! - `config/`: allow-listed configuration files and the application source
//! - `logs/`, `media/`, `templates/`, `static/`
//!
//! # Example
//!
//! ```rust,ignore
//! use archivist::backup::{BackupOrchestrator, BackupRegistry, RetentionManager};
//! use archivist::config::{BackupLayout, RetentionPolicy, SourceLayout};
//!
//! let layout = BackupLayout::new("/var/backups/app");
//! layout.ensure_root()?;
//!
//! let orchestrator = BackupOrchestrator::new(layout.clone(), &SourceLayout::rooted_at("/srv/app"), None);
//! let record = orchestrator.create_full_backup(true);
//! println!("{} success={}", record.name, record.success);
//!
//! let retention = RetentionManager::new(BackupRegistry::new(layout));
//! let report = retention.cleanup(&RetentionPolicy::default())?;
//! ```

pub mod archive;
pub mod collector;
pub mod components;
pub mod exporter;
mod orchestrator;
pub mod record;
mod registry;
mod restore;
mod retention;
mod stats;

pub use exporter::{CommandExporter, StateExporter};
pub use orchestrator::BackupOrchestrator;
pub use record::{BackupKind, BackupRecord, ComponentKind, ComponentResult, FileEntry};
pub use registry::{validate_name, BackupRegistry, ListedBackup, RegistryScan};
pub use restore::{RestoreManager, RestoreResult};
pub use retention::{select_evictions, CleanupReport, Eviction, EvictionReason, RetentionManager};
pub use stats::{Statistics, StatisticsReporter};
