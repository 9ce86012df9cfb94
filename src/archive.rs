// src/archive.rs

//! Package archive creation and extraction
//!
//! A package archive is a gzip-compressed tar regardless of its `.pkg`
//! extension. Its top-level entries are the payload layout itself; the
//! payload directory is never preserved as a wrapping entry.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;
use tar::{Archive, Builder};
use tracing::debug;

/// Create a package archive from the immediate children of `src_dir`.
///
/// Children whose basename is in `excluded_names` are skipped;
/// `included_paths` are appended as additional top-level entries. The
/// archive is written to a sibling `.tar.gz` path first and atomically
/// renamed to `out_path`.
pub fn create_archive(
    src_dir: impl AsRef<Path>,
    out_path: impl AsRef<Path>,
    included_paths: &[&Path],
    excluded_names: &[&str],
) -> Result<()> {
    let (src_dir, out_path) = (src_dir.as_ref(), out_path.as_ref());

    if !src_dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "'{}' must be a directory",
            src_dir.display()
        )));
    }

    let stem = out_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::InvalidInput(format!("invalid output path: '{}'", out_path.display())))?;
    let staging = out_path.with_file_name(format!("{stem}.tar.gz"));

    let file = File::create(&staging)
        .map_err(|e| Error::Filesystem(format!("create {}: {e}", staging.display())))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);

    let excluded: HashSet<&str> = excluded_names.iter().copied().collect();

    let entries = fs::read_dir(src_dir)
        .map_err(|e| Error::Filesystem(format!("read dir {}: {e}", src_dir.display())))?;
    for entry in entries {
        let entry = entry
            .map_err(|e| Error::Filesystem(format!("read dir {}: {e}", src_dir.display())))?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if excluded.contains(name_str.as_ref()) {
            debug!("excluding '{}' from archive", name_str);
            continue;
        }
        append_entry(&mut builder, &entry.path(), name_str.as_ref())?;
    }

    for path in included_paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidInput(format!("invalid include path: '{}'", path.display())))?;
        append_entry(&mut builder, path, name)?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| Error::Filesystem(format!("finish archive {}: {e}", staging.display())))?;
    encoder
        .finish()
        .map_err(|e| Error::Filesystem(format!("finish gzip {}: {e}", staging.display())))?;

    fs::rename(&staging, out_path).map_err(|e| {
        Error::Filesystem(format!(
            "rename {} to {}: {e}",
            staging.display(),
            out_path.display()
        ))
    })?;
    Ok(())
}

fn append_entry<W: std::io::Write>(
    builder: &mut Builder<W>,
    path: &Path,
    name: &str,
) -> Result<()> {
    let result = if path.is_dir() && !fs::symlink_metadata(path)?.file_type().is_symlink() {
        builder.append_dir_all(name, path)
    } else {
        builder.append_path_with_name(path, name)
    };
    result.map_err(|e| Error::Filesystem(format!("archive {}: {e}", path.display())))
}

/// Extract a package archive into `dest_dir` (created if absent).
pub fn extract_archive(archive_path: impl AsRef<Path>, dest_dir: impl AsRef<Path>) -> Result<()> {
    let (archive_path, dest_dir) = (archive_path.as_ref(), dest_dir.as_ref());

    fs::create_dir_all(dest_dir)
        .map_err(|e| Error::Filesystem(format!("create {}: {e}", dest_dir.display())))?;

    let file = File::open(archive_path)
        .map_err(|e| Error::Filesystem(format!("open {}: {e}", archive_path.display())))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive.unpack(dest_dir).map_err(|e| {
        Error::Filesystem(format!(
            "extract {} to {}: {e}",
            archive_path.display(),
            dest_dir.display()
        ))
    })?;
    Ok(())
}
