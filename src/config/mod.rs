//! Configuration module for Archivist
//!
//! This module provides configuration management including:
//! - Base directory and backup-root path resolution
//! - Settings persistence (source roots, exporter, retention)

pub mod paths;
pub mod settings;

pub use paths::{ArchivistPaths, BackupLayout};
pub use settings::{RetentionPolicy, Settings, SourceLayout, StateExportSettings};
