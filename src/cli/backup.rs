//! Backup CLI commands
//!
//! Implements the operator command surface over the backup engine.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Subcommand;
use serde_json::json;
use tracing::warn;

use crate::audit::{AuditAction, AuditEntry, AuditLogger};
use crate::backup::{
    BackupOrchestrator, BackupRecord, BackupRegistry, CleanupReport, CommandExporter,
    RestoreManager, RetentionManager, StateExporter, StatisticsReporter,
};
use crate::config::paths::ArchivistPaths;
use crate::config::settings::{RetentionPolicy, Settings};
use crate::config::BackupLayout;
use crate::error::{ArchivistError, ArchivistResult};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new full backup
    Create {
        /// Leave user-uploaded media out of the backup
        #[arg(long)]
        no_media: bool,
    },

    /// List all backups, newest first
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a backup and its metadata
    Delete {
        /// Backup name
        name: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Remove backups outside the retention policy
    Cleanup {
        /// Show what would be removed without removing anything
        #[arg(long)]
        dry_run: bool,

        /// Override the configured maximum number of backups
        #[arg(long)]
        max_count: Option<usize>,

        /// Override the configured retention in days
        #[arg(long)]
        retention_days: Option<u32>,
    },

    /// Extract a backup for inspection
    Restore {
        /// Backup name
        name: String,

        /// Target directory (defaults to restore_<name> under the backup root)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Show backup statistics
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent operator actions from the audit log
    History {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    paths: &ArchivistPaths,
    settings: &Settings,
    cmd: BackupCommands,
) -> ArchivistResult<()> {
    let layout = BackupLayout::new(settings.backup_root(paths));
    layout.ensure_root()?;

    let registry = BackupRegistry::new(layout.clone());
    let audit = AuditLogger::new(paths.audit_log());

    match cmd {
        BackupCommands::Create { no_media } => {
            let include_media = !no_media;
            println!("Creating backup...");
            if include_media {
                println!("Including media files.");
            } else {
                println!("Media files will not be included.");
            }

            let exporter = build_exporter(settings)?;
            let orchestrator = BackupOrchestrator::new(layout, &settings.sources, exporter);
            let record = orchestrator.create_full_backup(include_media);

            if record.success {
                println!("Backup created: {}", record.name);
                println!("Size: {}", format_size(record.artifact_size_bytes.unwrap_or(0)));
            } else {
                eprintln!("Backup failed: {}", record.name);
                for error in &record.errors {
                    eprintln!("  Error: {}", error);
                }
            }
            print_components(&record);

            if !record.success {
                return Err(ArchivistError::BackupFailed(record.name));
            }

            record_audit(
                &audit,
                AuditEntry::new(
                    AuditAction::BackupCreated,
                    Some(record.name.clone()),
                    json!({
                        "include_media": include_media,
                        "size_bytes": record.artifact_size_bytes.unwrap_or(0),
                        "components": record.components.len(),
                    }),
                ),
            );
        }

        BackupCommands::List { json } => {
            let scan = registry.scan()?;
            let backups = &scan.backups;

            if json {
                println!("{}", serde_json::to_string_pretty(backups)?);
                return Ok(());
            }

            if !scan.unreadable.is_empty() {
                println!("{} unreadable record(s) skipped:", scan.unreadable.len());
                for file_name in &scan.unreadable {
                    println!("  - {}", file_name);
                }
                println!();
            }

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: archivist create");
                return Ok(());
            }

            println!("Found {} backup(s):", backups.len());
            println!();

            for backup in backups {
                let record = &backup.record;
                let age = chrono::Utc::now().signed_duration_since(record.created_at);
                let artifact = if backup.artifact_exists {
                    "artifact present"
                } else {
                    "artifact missing"
                };

                println!("{} {}", status_mark(record.success), record.name);
                println!(
                    "   Created: {} ({} ago)",
                    record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    format_duration(age)
                );
                println!(
                    "   Size: {} ({})",
                    format_size(record.artifact_size_bytes.unwrap_or(0)),
                    artifact
                );
                println!(
                    "   Components: {}, files: {}",
                    record.components.len(),
                    record.file_count()
                );
                if !record.errors.is_empty() {
                    println!("   Errors: {}", record.errors.len());
                }
                println!();
            }
        }

        BackupCommands::Delete { name, force } => {
            if !registry.exists(&name) {
                println!("Backup not found: {}", name);
                return Ok(());
            }

            if !force {
                let confirmed = confirm(&format!(
                    "Are you sure you want to delete backup \"{}\"? (y/N): ",
                    name
                ))?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            if registry.delete(&name)? {
                println!("Backup removed: {}", name);
                record_audit(
                    &audit,
                    AuditEntry::new(AuditAction::BackupDeleted, Some(name), json!({})),
                );
            } else {
                println!("Backup not found: {}", name);
            }
        }

        BackupCommands::Cleanup {
            dry_run,
            max_count,
            retention_days,
        } => {
            let policy = effective_policy(&settings.retention, max_count, retention_days);
            let retention = RetentionManager::new(registry);

            if dry_run {
                println!("DRY RUN: no changes will be made");
            }
            println!(
                "Cleaning up backups (keep at most {}, none older than {} days)...",
                policy.max_count, policy.retention_days
            );

            let report = if dry_run {
                retention.dry_run(&policy)?
            } else {
                retention.cleanup(&policy)?
            };
            print_cleanup(&report, dry_run);

            if !dry_run && report.removed_count > 0 {
                record_audit(
                    &audit,
                    AuditEntry::new(
                        AuditAction::BackupCleanup,
                        None,
                        json!({
                            "removed_count": report.removed_count,
                            "removed_backups": report.removed,
                        }),
                    ),
                );
            }

            if !report.errors.is_empty() {
                return Err(ArchivistError::Storage(format!(
                    "{} backup(s) could not be removed",
                    report.errors.len()
                )));
            }
        }

        BackupCommands::Restore { name, path } => {
            println!("Extracting backup: {}", name);
            let result = RestoreManager::new(registry).restore(&name, path.as_deref())?;

            println!("Backup extracted to: {}", result.target_dir.display());
            println!("Files extracted: {}", result.extracted.len());

            record_audit(
                &audit,
                AuditEntry::new(
                    AuditAction::BackupRestored,
                    Some(name),
                    json!({
                        "restore_path": result.target_dir,
                        "files_count": result.extracted.len(),
                    }),
                ),
            );
        }

        BackupCommands::Stats { json } => {
            let stats = StatisticsReporter::new(registry).statistics()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }

            println!("Backup Statistics");
            println!("=================");
            println!("Total backups:      {}", stats.total_backups);
            println!("Successful:         {}", stats.successful_backups);
            println!("Failed:             {}", stats.failed_backups);
            println!(
                "Total size:         {}",
                format_size(stats.total_artifact_size_bytes)
            );
            if let Some(oldest) = stats.oldest_created_at {
                println!("Oldest backup:      {}", oldest.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if let Some(newest) = stats.newest_created_at {
                println!("Newest backup:      {}", newest.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if stats.unreadable_records > 0 {
                println!("Unreadable records: {}", stats.unreadable_records);
            }
            println!("Backup directory:   {}", stats.backup_directory.display());
        }

        BackupCommands::History { limit } => {
            let entries = audit.read_recent(limit)?;

            if entries.is_empty() {
                println!("No audit entries.");
                return Ok(());
            }

            for entry in &entries {
                println!("{}", entry.format_human_readable());
            }
        }
    }

    Ok(())
}

/// Build the configured state exporter, run from the application root
fn build_exporter(settings: &Settings) -> ArchivistResult<Option<Box<dyn StateExporter>>> {
    match &settings.state_export {
        Some(export) => {
            let exporter =
                CommandExporter::from_settings(export)?.in_dir(settings.sources.app_root.clone());
            Ok(Some(Box::new(exporter)))
        }
        None => Ok(None),
    }
}

/// The configured policy with command-line overrides applied
fn effective_policy(
    configured: &RetentionPolicy,
    max_count: Option<usize>,
    retention_days: Option<u32>,
) -> RetentionPolicy {
    RetentionPolicy {
        max_count: max_count.unwrap_or(configured.max_count),
        retention_days: retention_days.unwrap_or(configured.retention_days),
    }
}

fn print_components(record: &BackupRecord) {
    println!("Components: {}", record.components.len());
    for component in &record.components {
        println!(
            "  {} {}: {} files",
            status_mark(component.success),
            component.name,
            component.files.len()
        );
        for error in &component.errors {
            println!("    Warning: {}", error);
        }
    }
}

fn print_cleanup(report: &CleanupReport, dry_run: bool) {
    if report.removed_count > 0 {
        let verb = if dry_run { "Would remove" } else { "Removed" };
        println!("{} {} backup(s)", verb, report.removed_count);
        for eviction in &report.removed {
            println!("  - {} ({})", eviction.name, eviction.reason);
        }
    } else {
        println!("No backups to remove.");
    }

    if !report.errors.is_empty() {
        eprintln!("Errors during cleanup:");
        for error in &report.errors {
            eprintln!("  - {}", error);
        }
    }
}

fn record_audit(audit: &AuditLogger, entry: AuditEntry) {
    if let Err(e) = audit.log(&entry) {
        warn!("Failed to write audit entry for {}: {}", entry.action, e);
    }
}

/// Ask a yes/no question on stdin; anything but yes is a no
fn confirm(prompt: &str) -> ArchivistResult<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn status_mark(success: bool) -> &'static str {
    if success {
        "✓"
    } else {
        "✗"
    }
}

/// Format a duration in human-readable form
fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    let months = days / 30;
    format!("{}mo", months)
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(12), "12 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::minutes(5)), "5m");
        assert_eq!(format_duration(chrono::Duration::hours(3)), "3h");
        assert_eq!(format_duration(chrono::Duration::days(2)), "2d");
        assert_eq!(format_duration(chrono::Duration::days(65)), "2mo");
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("n"));
        assert!(!is_yes("sure"));
    }

    #[test]
    fn test_effective_policy_overrides() {
        let configured = RetentionPolicy::default();

        assert_eq!(effective_policy(&configured, None, None), configured);
        let overridden = effective_policy(&configured, Some(3), Some(7));
        assert_eq!(overridden.max_count, 3);
        assert_eq!(overridden.retention_days, 7);
    }

    #[test]
    fn test_exporter_only_when_configured() {
        let mut settings = Settings::default();
        assert!(build_exporter(&settings).unwrap().is_none());

        settings.state_export = Some(crate::config::StateExportSettings {
            command: vec!["echo".into(), "{}".into()],
            extension: "json".into(),
        });
        let exporter = build_exporter(&settings).unwrap().unwrap();
        assert_eq!(exporter.extension(), "json");

        settings.state_export = Some(crate::config::StateExportSettings {
            command: Vec::new(),
            extension: "json".into(),
        });
        assert!(build_exporter(&settings).is_err());
    }
}
