//! File collection into a staging area
//!
//! Copies a file or directory tree under a staging root and records a
//! `FileEntry` for every regular file copied. Copying is best-effort: one bad
//! file is reported and the rest are still copied.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use super::record::FileEntry;
use crate::error::{ArchivistError, ArchivistResult};

/// Directory names never copied
const TRANSIENT_DIRS: &[&str] = &["__pycache__", ".pytest_cache", ".mypy_cache"];

/// File extensions never copied (compiled bytecode)
const TRANSIENT_EXTENSIONS: &[&str] = &["pyc", "pyo"];

/// Options for a single collection
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Descend into subdirectories; otherwise only direct children are copied
    pub recursive: bool,

    /// Additional file names to leave out
    pub skip_names: Vec<String>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            skip_names: Vec::new(),
        }
    }
}

impl CollectOptions {
    /// Only the direct children of the source directory
    pub fn flat() -> Self {
        Self {
            recursive: false,
            ..Self::default()
        }
    }

    pub fn skipping(mut self, name: impl Into<String>) -> Self {
        self.skip_names.push(name.into());
        self
    }
}

/// Files copied by one collection plus per-file failures
#[derive(Debug, Default)]
pub struct Collected {
    pub files: Vec<FileEntry>,
    pub errors: Vec<String>,
}

/// Copies sources into a staging root
#[derive(Debug, Clone)]
pub struct FileCollector {
    staging_root: PathBuf,
}

impl FileCollector {
    pub fn new(staging_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
        }
    }

    /// Copy `source` to `<staging_root>/<dest>`
    ///
    /// A file source is copied to exactly `dest`; a directory source has its
    /// contents copied under `dest`. A missing source yields an empty
    /// collection. Only a source that exists but cannot be read at all is an
    /// error.
    pub fn collect(
        &self,
        source: &Path,
        dest: &Path,
        options: &CollectOptions,
    ) -> ArchivistResult<Collected> {
        let metadata = match fs::metadata(source) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Source {} does not exist, nothing to collect", source.display());
                return Ok(Collected::default());
            }
            Err(e) => {
                return Err(ArchivistError::Io(format!(
                    "Failed to read {}: {}",
                    source.display(),
                    e
                )))
            }
        };

        let mut collected = Collected::default();

        if metadata.is_file() {
            if !self.is_skipped_file(source, options) {
                self.copy_file(source, &self.staging_root.join(dest), &mut collected);
            }
            return Ok(collected);
        }

        let max_depth = if options.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(source)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_transient_dir(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(ArchivistError::Io(format!(
                        "Failed to read {}: {}",
                        source.display(),
                        e
                    )))
                }
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", source.display(), e);
                    collected
                        .errors
                        .push(format!("Failed to read entry under {}: {}", source.display(), e));
                    continue;
                }
            };

            if !is_regular_file(&entry) || self.is_skipped_file(entry.path(), options) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source)
                .unwrap_or_else(|_| entry.path());
            let target = self.staging_root.join(dest).join(relative);
            self.copy_file(entry.path(), &target, &mut collected);
        }

        Ok(collected)
    }

    fn copy_file(&self, source: &Path, target: &Path, collected: &mut Collected) {
        match self.try_copy(source, target) {
            Ok(entry) => collected.files.push(entry),
            Err(e) => {
                warn!("Failed to copy {}: {}", source.display(), e);
                collected
                    .errors
                    .push(format!("Failed to copy {}: {}", source.display(), e));
            }
        }
    }

    fn try_copy(&self, source: &Path, target: &Path) -> std::io::Result<FileEntry> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, target)?;
        let size_bytes = fs::metadata(target)?.len();

        Ok(FileEntry {
            name: target
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            size_bytes,
            relative_path: relative_to_root(&self.staging_root, target),
        })
    }

    fn is_skipped_file(&self, path: &Path, options: &CollectOptions) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        is_transient_file(path) || options.skip_names.iter().any(|skip| *skip == name)
    }
}

/// `/`-separated path of `path` relative to `root`
pub fn relative_to_root(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_transient_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && TRANSIENT_DIRS
            .iter()
            .any(|name| entry.file_name().to_string_lossy() == *name)
}

fn is_transient_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            TRANSIENT_EXTENSIONS.iter().any(|t| ext == *t)
        })
        .unwrap_or(false)
}

/// Regular files, and symlinks that resolve to regular files
fn is_regular_file(entry: &DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    entry.path_is_symlink()
        && fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false)
}
