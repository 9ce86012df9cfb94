// src/client/patcher.rs

//! Relocation patching for libtool and pkg-config metadata
//!
//! `.la` and `.pc` files embed absolute paths from the original build's
//! `--prefix`, which no longer hold once the package is merged into a new
//! prefix. The patcher rewrites those lines in place, preserving each
//! file's permission bits and only writing when the content changed.
//! Per-file failures are collected and surfaced as one aggregated error so
//! a single unreadable file does not stop the rest.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

static LA_LIBDIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"libdir='.*'").unwrap());
static PC_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^prefix=.*").unwrap());
static PC_LIBDIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^libdir=.*").unwrap());
static PC_INCLUDEDIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(includedir=).*(/include.*)$").unwrap());

/// Patch every `*.la` directly under `tgt_libdir` and every `*.pc` under
/// `tgt_libdir/pkgconfig/` so they refer to `install_libdir` and
/// `install_prefix`.
///
/// A missing `tgt_libdir` is not an error; it is skipped with a warning.
pub fn patch_lib_files(
    tgt_libdir: &Path,
    install_libdir: &Path,
    install_prefix: &Path,
) -> Result<()> {
    if !tgt_libdir.is_dir() {
        warn!(
            "directory '{}' not found while patching libraries, skipped",
            tgt_libdir.display()
        );
        return Ok(());
    }

    let mut failures: Vec<String> = Vec::new();

    for la in files_with_extension(tgt_libdir, "la", &mut failures) {
        patch_one(&la, &mut failures, |content| {
            let replacement = format!("libdir='{}'", install_libdir.display());
            LA_LIBDIR
                .replace_all(content, regex::NoExpand(&replacement))
                .into_owned()
        });
    }

    let pkgconfig = tgt_libdir.join("pkgconfig");
    if pkgconfig.is_dir() {
        for pc in files_with_extension(&pkgconfig, "pc", &mut failures) {
            patch_one(&pc, &mut failures, |content| {
                let prefix_line = format!("prefix={}", install_prefix.display());
                let libdir_line = format!("libdir={}", install_libdir.display());
                let content = PC_PREFIX.replace_all(content, regex::NoExpand(&prefix_line));
                let content = PC_LIBDIR.replace_all(&content, regex::NoExpand(&libdir_line));
                PC_INCLUDEDIR
                    .replace_all(&content, |caps: &regex::Captures| {
                        format!("{}{}{}", &caps[1], install_prefix.display(), &caps[2])
                    })
                    .into_owned()
            });
        }
    }

    if !failures.is_empty() {
        return Err(Error::Filesystem(format!(
            "some operations failed while patching libraries:\n{}",
            failures.join("\n")
        )));
    }
    Ok(())
}

/// Regular files with the given extension directly under `dir`, sorted
fn files_with_extension(dir: &Path, ext: &str, failures: &mut Vec<String>) -> Vec<std::path::PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            failures.push(format!("read dir {}: {e}", dir.display()));
            return Vec::new();
        }
    };
    let mut out = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == ext).unwrap_or(false) {
            out.push(path);
        }
    }
    out.sort();
    out
}

/// Rewrite one file through `transform`, preserving its mode; failures are
/// recorded, not returned.
fn patch_one(path: &Path, failures: &mut Vec<String>, transform: impl Fn(&str) -> String) {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            failures.push(format!("stat {}: {e}", path.display()));
            return;
        }
    };
    if !meta.is_file() {
        info!("skip irregular file '{}'", path.display());
        return;
    }

    info!("patching {}", path.display());
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            failures.push(format!("read {}: {e}", path.display()));
            return;
        }
    };

    let patched = transform(&content);
    if patched == content {
        return;
    }

    if let Err(e) = fs::write(path, &patched) {
        failures.push(format!("write {}: {e}", path.display()));
        return;
    }
    if let Err(e) = fs::set_permissions(path, meta.permissions()) {
        failures.push(format!("chmod {}: {e}", path.display()));
    }
}
