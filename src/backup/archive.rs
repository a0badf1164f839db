//! Artifact packaging
//!
//! Packages a staging directory into one Deflate-compressed zip artifact and
//! extracts artifacts back out. Entry names are paths relative to the staging
//! root, so extraction reproduces the staged layout wherever it lands.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::collector::relative_to_root;
use crate::config::BackupLayout;
use crate::error::{ArchivistError, ArchivistResult};

/// Packages staging directories into artifacts under a backup root
#[derive(Debug, Clone)]
pub struct Archiver {
    layout: BackupLayout,
}

impl Archiver {
    pub fn new(layout: BackupLayout) -> Self {
        Self { layout }
    }

    /// Write every regular file under `staging_root` into `<root>/<name>.zip`
    ///
    /// Files are added in lexicographic walk order. Any failure is returned;
    /// the caller is responsible for removing a partial artifact.
    pub fn create_archive(&self, staging_root: &Path, name: &str) -> ArchivistResult<PathBuf> {
        let artifact_path = self.layout.artifact_path(name);
        let file = File::create(&artifact_path).map_err(|e| {
            ArchivistError::Archive(format!(
                "Failed to create {}: {}",
                artifact_path.display(),
                e
            ))
        })?;

        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(true);

        for entry in WalkDir::new(staging_root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let member = relative_to_root(staging_root, entry.path());
            zip.start_file(member.as_str(), options)?;
            let mut source = BufReader::new(File::open(entry.path())?);
            io::copy(&mut source, &mut zip)?;
            debug!("Archived {}", member);
        }

        let mut writer = zip.finish()?;
        writer.flush()?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| ArchivistError::Archive(format!("Failed to sync artifact: {}", e)))?;

        Ok(artifact_path)
    }
}

/// Extract every member of `artifact_path` under `target_root`
///
/// Existing contents of `target_root` are kept; members overwrite files with
/// the same relative path. Returns member names in archive order.
pub fn extract_archive(artifact_path: &Path, target_root: &Path) -> ArchivistResult<Vec<String>> {
    let file = File::open(artifact_path).map_err(|e| {
        ArchivistError::Archive(format!("Failed to open {}: {}", artifact_path.display(), e))
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    fs::create_dir_all(target_root)?;

    let mut members = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut member = archive.by_index(index)?;
        let name = member.name().to_string();

        let relative = member.enclosed_name().map(Path::to_path_buf).ok_or_else(|| {
            ArchivistError::Archive(format!("Refusing to extract unsafe member '{}'", name))
        })?;
        let target = target_root.join(relative);

        if member.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = BufWriter::new(File::create(&target)?);
            io::copy(&mut member, &mut out)?;
            out.flush()?;
        }

        members.push(name);
    }

    Ok(members)
}

/// Member names of an artifact without extracting it
pub fn list_members(artifact_path: &Path) -> ArchivistResult<Vec<String>> {
    let file = File::open(artifact_path).map_err(|e| {
        ArchivistError::Archive(format!("Failed to open {}: {}", artifact_path.display(), e))
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    (0..archive.len())
        .map(|index| Ok(archive.by_index(index)?.name().to_string()))
        .collect()
}
