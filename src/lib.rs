//! Archivist - full backups with retention for application state
//!
//! This library provides a backup-and-retention engine for a web application's
//! durable state. Each run copies the exported records, migrations,
//! configuration, logs, media, templates and static assets into a staging
//! directory, packages it as one compressed archive and records metadata about
//! the run. Backups can then be listed, pruned, extracted and summarized.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path resolution and settings
//! - `error`: Custom error types
//! - `storage`: Durable JSON documents
//! - `backup`: Components, archiving, registry, retention, restore, statistics
//! - `audit`: Audit logging of operator actions
//! - `cli`: Command handlers
//! - `logging`: Diagnostics setup
//!
//! # Example
//!
//! ```rust,ignore
//! use archivist::config::{paths::ArchivistPaths, settings::Settings};
//!
//! let paths = ArchivistPaths::new()?;
//! let settings = Settings::load_from(&paths.settings_file())?;
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;

pub use error::{ArchivistError, ArchivistResult};
