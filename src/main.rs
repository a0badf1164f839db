use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use archivist::cli::{handle_backup_command, BackupCommands};
use archivist::config::{paths::ArchivistPaths, settings::Settings, BackupLayout};

#[derive(Parser)]
#[command(
    name = "archivist",
    version,
    about = "Full backups with retention for application state",
    long_about = "Archivist snapshots an application's durable state (exported records, \
                  migrations, configuration, logs, media, templates and static assets) \
                  into one compressed archive per run, keeps JSON metadata about every \
                  backup, and prunes them by count and age."
)]
struct Cli {
    /// Settings file (defaults to config.json in the data directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set (e.g. "debug")
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Backup(BackupCommands),

    /// Write default settings and create the backup directory
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = ArchivistPaths::new()?;
    let settings_file = cli.config.clone().unwrap_or_else(|| paths.settings_file());
    let settings = Settings::load_from(&settings_file)?;

    let level = cli.log_level.as_deref().unwrap_or(&settings.log_level);
    archivist::logging::init(level)?;

    match cli.command {
        Some(Commands::Backup(cmd)) => {
            handle_backup_command(&paths, &settings, cmd)?;
        }
        Some(Commands::Init) => {
            let backup_root = settings.backup_root(&paths);
            println!("Initializing Archivist at: {}", paths.base_dir().display());

            if settings_file.exists() {
                println!("Settings already exist: {}", settings_file.display());
            } else {
                settings.save(&settings_file)?;
                println!("Default settings written: {}", settings_file.display());
            }
            BackupLayout::new(&backup_root).ensure_root()?;
            println!("Backup directory ready: {}", backup_root.display());
            println!();
            println!("Edit the settings file to point 'sources' at your application");
            println!("and 'state_export.command' at its record dump tool.");
        }
        Some(Commands::Config) => {
            println!("Archivist Configuration");
            println!("=======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Settings file:    {}", settings_file.display());
            println!("Backup directory: {}", settings.backup_root(&paths).display());
            println!("Audit log:        {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Application root: {}", settings.sources.app_root.display());
            match &settings.state_export {
                Some(export) => println!("  State export:     {}", export.command.join(" ")),
                None => println!("  State export:     (not configured)"),
            }
            println!(
                "  Retention:        {} backups, {} days",
                settings.retention.max_count, settings.retention.retention_days
            );
            println!("  Log level:        {}", settings.log_level);
        }
        None => {
            println!("Archivist - full backups with retention");
            println!();
            println!("Run 'archivist --help' for usage information.");
        }
    }

    Ok(())
}
