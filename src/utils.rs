use crate::error::{ConvertError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const DEFAULT_OUTPUT_DIR: &str = "laverna-backup";
pub const DEFAULT_ARCHIVE: &str = "laverna.zip";

/// Configuration required to run the conversion.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub enex_path: PathBuf,
    /// Directory relative paths are resolved against, and archive entries are
    /// named relative to.
    pub base_dir: PathBuf,
    pub output_dir: PathBuf,
    pub archive_path: PathBuf,
    pub verbose: bool,
    pub quiet: bool,
}

impl ExportConfig {
    pub fn new(enex_path: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            enex_path: enex_path.into(),
            base_dir: base_dir.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            archive_path: PathBuf::from(DEFAULT_ARCHIVE),
            verbose: false,
            quiet: false,
        }
    }

    pub fn output_root(&self) -> PathBuf {
        self.base_dir.join(&self.output_dir)
    }

    pub fn archive_file(&self) -> PathBuf {
        self.base_dir.join(&self.archive_path)
    }

    pub fn export_file(&self) -> PathBuf {
        self.base_dir.join(&self.enex_path)
    }
}

/// Create an empty staging directory beside `root`, so the final move stays on
/// one filesystem. It is deleted when dropped.
pub fn create_staging(root: &Path) -> Result<TempDir> {
    let parent = root.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|e| {
        ConvertError::io(format!("Failed to create directory: {}", parent.display()), e)
    })?;

    tempfile::Builder::new()
        .prefix(".laverna-staging-")
        .tempdir_in(parent)
        .map_err(|e| {
            ConvertError::io(
                format!("Failed to create staging directory in {}", parent.display()),
                e,
            )
        })
}

/// Move every file staged under `staging` to the same relative path under
/// `root`, replacing files that already exist there. Returns the number of
/// files moved.
pub fn commit_staging(staging: TempDir, root: &Path) -> Result<usize> {
    let mut moved = 0usize;
    for entry in WalkDir::new(staging.path()).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            ConvertError::io(
                format!("Failed to walk: {}", staging.path().display()),
                e.into(),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(staging.path())
            .unwrap_or(entry.path());
        let target = root.join(relative);
        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                ConvertError::io(format!("Failed to create directory: {}", dir.display()), e)
            })?;
        }
        fs::rename(entry.path(), &target).map_err(|e| {
            ConvertError::io(format!("Failed to move into place: {}", target.display()), e)
        })?;
        moved += 1;
    }

    staging.close().map_err(|e| ConvertError::io("Failed to remove staging directory", e))?;
    log::debug!("Moved {moved} staged files into {}", root.display());
    Ok(moved)
}
