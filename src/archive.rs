use crate::error::{ConvertError, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip every regular file under `root` into `archive_path`.
///
/// Entries are named relative to `base_dir` with `/` separators, in file-name
/// order; directories get no entries of their own. Returns the number of files
/// added.
pub fn create_archive(root: &Path, base_dir: &Path, archive_path: &Path) -> Result<usize> {
    let file = File::create(archive_path).map_err(|e| {
        ConvertError::io(
            format!("Failed to create archive: {}", archive_path.display()),
            e,
        )
    })?;
    let archive_identity = fs::canonicalize(archive_path).map_err(|e| {
        ConvertError::io(
            format!("Failed to resolve archive path: {}", archive_path.display()),
            e,
        )
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0usize;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            ConvertError::io(format!("Failed to walk: {}", root.display()), e.into())
        })?;
        if !entry.file_type().is_file() || is_same_file(entry.path(), &archive_identity) {
            continue;
        }

        let path = entry.path();
        let name = entry_name(path, base_dir, root);
        let mut source = File::open(path)
            .map_err(|e| ConvertError::io(format!("Failed to open: {}", path.display()), e))?;
        zip.start_file(name.as_str(), options)
            .map_err(|e| archive_error(&name, e))?;
        io::copy(&mut source, &mut zip)
            .map_err(|e| ConvertError::io(format!("Failed to archive: {name}"), e))?;

        log::debug!("Archived {name}");
        count += 1;
    }

    zip.finish()
        .map_err(|e| archive_error(&archive_path.display().to_string(), e))?
        .flush()
        .map_err(|e| {
            ConvertError::io(
                format!("Failed to write archive: {}", archive_path.display()),
                e,
            )
        })?;

    log::info!("Archived {count} files into {}", archive_path.display());
    Ok(count)
}

/// Archive entry name for `path`: relative to `base_dir`, or to the parent of
/// `root` when the output root lives outside `base_dir`.
pub fn entry_name(path: &Path, base_dir: &Path, root: &Path) -> String {
    let relative = path
        .strip_prefix(base_dir)
        .or_else(|_| path.strip_prefix(root.parent().unwrap_or(root)))
        .unwrap_or(path);

    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `canonical` must already be canonicalized. Only paths sharing its file
/// name are resolved.
fn is_same_file(path: &Path, canonical: &Path) -> bool {
    path.file_name() == canonical.file_name()
        && fs::canonicalize(path).is_ok_and(|resolved| resolved == canonical)
}

fn archive_error(name: &str, err: ZipError) -> ConvertError {
    let source = match err {
        ZipError::Io(e) => e,
        other => io::Error::other(other),
    };
    ConvertError::io(format!("Failed to archive: {name}"), source)
}
