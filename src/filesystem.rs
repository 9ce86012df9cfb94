// src/filesystem.rs

//! Filesystem helpers for the installer and deployer
//!
//! Copies preserve permission bits and recreate symbolic links verbatim
//! (never following them). Recursive copies track canonicalized real paths
//! to break symlink cycles.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Copy `src` to `dst`, overwriting, preserving the source's permission
/// bits. Parent directories are created; the destination is fsynced.
pub fn copy_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());

    let mut reader = File::open(src)
        .map_err(|e| Error::Filesystem(format!("open {}: {e}", src.display())))?;
    let perm = reader
        .metadata()
        .map_err(|e| Error::Filesystem(format!("stat {}: {e}", src.display())))?
        .permissions();

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Filesystem(format!("create {}: {e}", parent.display())))?;
    }

    let mut writer = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dst)
        .map_err(|e| Error::Filesystem(format!("create {}: {e}", dst.display())))?;

    io::copy(&mut reader, &mut writer)
        .map_err(|e| Error::Filesystem(format!("copy to {}: {e}", dst.display())))?;
    writer
        .set_permissions(perm)
        .map_err(|e| Error::Filesystem(format!("chmod {}: {e}", dst.display())))?;
    writer
        .sync_all()
        .map_err(|e| Error::Filesystem(format!("fsync {}: {e}", dst.display())))?;
    Ok(())
}

/// Copy all contents of `src_dir` into `dst_dir` (overwriting).
///
/// Regular files keep their mode bits; symlinks are recreated with their
/// original target, whether or not it resolves; real subdirectories are
/// recursed into. The destination may not equal or live inside the source.
/// A real path seen twice (a filesystem cycle via symlinked parents) is
/// skipped rather than recursed into again.
pub fn copy_dir_contents(src_dir: impl AsRef<Path>, dst_dir: impl AsRef<Path>) -> Result<()> {
    let (src_dir, dst_dir) = (src_dir.as_ref(), dst_dir.as_ref());

    let abs_src = absolute(src_dir)?;
    let abs_dst = absolute(dst_dir)?;
    if abs_dst == abs_src || abs_dst.starts_with(&abs_src) {
        return Err(Error::Filesystem(format!(
            "destination '{}' cannot be same as or inside source '{}'",
            abs_dst.display(),
            abs_src.display()
        )));
    }

    let mut visited = HashSet::new();
    copy_dir_recursive(src_dir, dst_dir, &mut visited)
}

fn copy_dir_recursive(
    src_dir: &Path,
    dst_dir: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<()> {
    let real_src = src_dir
        .canonicalize()
        .map_err(|e| Error::Filesystem(format!("resolve {}: {e}", src_dir.display())))?;
    if !visited.insert(real_src) {
        // already copied through another path; a revisit would recurse forever
        return Ok(());
    }

    fs::create_dir_all(dst_dir)
        .map_err(|e| Error::Filesystem(format!("create {}: {e}", dst_dir.display())))?;

    let entries = fs::read_dir(src_dir)
        .map_err(|e| Error::Filesystem(format!("read dir {}: {e}", src_dir.display())))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| Error::Filesystem(format!("read dir {}: {e}", src_dir.display())))?;
        let src_path = entry.path();
        let dst_path = dst_dir.join(entry.file_name());

        let meta = fs::symlink_metadata(&src_path)
            .map_err(|e| Error::Filesystem(format!("stat {}: {e}", src_path.display())))?;

        if meta.file_type().is_symlink() {
            let target = fs::read_link(&src_path)
                .map_err(|e| Error::Filesystem(format!("readlink {}: {e}", src_path.display())))?;
            let _ = fs::remove_file(&dst_path);
            std::os::unix::fs::symlink(&target, &dst_path).map_err(|e| {
                Error::Filesystem(format!("symlink {}: {e}", dst_path.display()))
            })?;
        } else if meta.is_dir() {
            copy_dir_recursive(&src_path, &dst_path, visited)?;
        } else {
            copy_file(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Resolve a path to absolute form without requiring it to exist
pub fn absolute(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Filesystem(format!("current dir: {e}")))?;
        Ok(cwd.join(path))
    }
}
