//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't leave half-written metadata
//! documents behind on failure.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::ArchivistError;

/// Read JSON from a file, returning an error if file doesn't exist
pub fn read_json_required<T, P>(path: P) -> Result<T, ArchivistError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Err(ArchivistError::Storage(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let file = File::open(path).map_err(|e| {
        ArchivistError::Storage(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        ArchivistError::Storage(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Write JSON to a file atomically (write to temp, then rename)
///
/// The file is either completely written or not modified at all.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), ArchivistError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let temp_path = write_temp(path, data)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ArchivistError::Storage(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}

/// Write JSON to a file that must not exist yet
///
/// The document is staged in a temp file and published with a hard link,
/// which fails instead of replacing an existing file. Returns
/// `ArchivistError::Duplicate` if `path` is already present.
pub fn write_json_new<T, P>(path: P, data: &T) -> Result<(), ArchivistError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.exists() {
        return Err(duplicate(path));
    }

    let temp_path = write_temp(path, data)?;
    let linked = fs::hard_link(&temp_path, path);
    let _ = fs::remove_file(&temp_path);

    match linked {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(duplicate(path)),
        Err(e) => Err(ArchivistError::Storage(format!(
            "Failed to publish {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Serialize `data` into a synced temp file next to `path`
fn write_temp<T: Serialize>(path: &Path, data: &T) -> Result<PathBuf, ArchivistError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ArchivistError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Same directory as the target, so the final rename/link stays on one filesystem
    let temp_path = temp_path_for(path);

    let file = File::create(&temp_path)
        .map_err(|e| ArchivistError::Storage(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    let written = serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| ArchivistError::Storage(format!("Failed to serialize data: {}", e)))
        .and_then(|_| {
            writer
                .flush()
                .map_err(|e| ArchivistError::Storage(format!("Failed to flush data: {}", e)))
        })
        .and_then(|_| {
            writer
                .get_ref()
                .sync_all()
                .map_err(|e| ArchivistError::Storage(format!("Failed to sync data: {}", e)))
        });

    if let Err(e) = written {
        drop(writer);
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(temp_path)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
}

fn duplicate(path: &Path) -> ArchivistError {
    ArchivistError::Duplicate {
        entity_type: "File",
        identifier: path.display().to_string(),
    }
}
