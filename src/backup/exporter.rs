//! State exporters
//!
//! A state exporter produces a serialized, human-diffable dump of every
//! persisted record. The engine treats the output as opaque bytes.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::StateExportSettings;
use crate::error::{ArchivistError, ArchivistResult};

/// Capability producing the persisted-record dump
pub trait StateExporter {
    /// Extension hint for the dump file, without the dot
    fn extension(&self) -> &str;

    /// Write the complete dump to `out`
    fn export(&self, out: &mut dyn Write) -> ArchivistResult<()>;
}

/// Runs an external command and streams its stdout as the dump
///
/// This is how framework-specific dump tools (`manage.py dumpdata`,
/// `pg_dump`, `sqlite3 .dump`) are plugged in.
#[derive(Debug, Clone)]
pub struct CommandExporter {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    extension: String,
}

impl CommandExporter {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            extension: extension.into(),
        }
    }

    /// Build an exporter from settings; the first word is the program
    pub fn from_settings(settings: &StateExportSettings) -> ArchivistResult<Self> {
        let (program, args) = settings.command.split_first().ok_or_else(|| {
            ArchivistError::Config("state_export.command must not be empty".into())
        })?;
        Ok(Self::new(program.clone(), args.to_vec(), settings.extension.clone()))
    }

    /// Run the command from `dir`
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl StateExporter for CommandExporter {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn export(&self, out: &mut dyn Write) -> ArchivistResult<()> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            ArchivistError::Export(format!("Failed to start '{}': {}", self.program, e))
        })?;

        let copied = match child.stdout.take() {
            Some(mut stdout) => io::copy(&mut stdout, out),
            None => Ok(0),
        };
        let status = child.wait().map_err(|e| {
            ArchivistError::Export(format!("Failed to wait for '{}': {}", self.program, e))
        })?;

        copied.map_err(|e| {
            ArchivistError::Export(format!("Failed to write output of '{}': {}", self.program, e))
        })?;

        if !status.success() {
            return Err(ArchivistError::Export(format!(
                "'{}' exited with {}",
                self.program, status
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_splits_program() {
        let settings = StateExportSettings {
            command: vec!["python".into(), "manage.py".into(), "dumpdata".into()],
            extension: "json".into(),
        };
        let exporter = CommandExporter::from_settings(&settings).unwrap();

        assert_eq!(exporter.program, "python");
        assert_eq!(exporter.args, vec!["manage.py", "dumpdata"]);
        assert_eq!(exporter.extension(), "json");
    }

    #[test]
    fn test_empty_command_is_config_error() {
        let settings = StateExportSettings {
            command: Vec::new(),
            extension: "json".into(),
        };
        assert!(CommandExporter::from_settings(&settings)
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn test_missing_program_fails() {
        let exporter = CommandExporter::new("archivist-no-such-program", Vec::new(), "json");
        let mut out = Vec::new();

        let err = exporter.export(&mut out).unwrap_err();
        assert!(matches!(err, ArchivistError::Export(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_streams_stdout() {
        let exporter = CommandExporter::new("echo", vec!["{}".into()], "json");
        let mut out = Vec::new();

        exporter.export(&mut out).unwrap();
        assert_eq!(out, b"{}\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_fails() {
        let exporter = CommandExporter::new("false", Vec::new(), "json");
        let mut out = Vec::new();

        assert!(exporter.export(&mut out).is_err());
    }
}
