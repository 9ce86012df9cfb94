// src/repo.rs

//! Repository layout and the deployer
//!
//! A repository is a directory tree served over plain HTTP:
//!
//! ```text
//! channels/<channel>/
//!   pkgs/
//!     <fingerprint>.pkg
//!     <fingerprint>.json
//!   index.json
//! public_keys/      # reserved
//! signatures/       # reserved
//! ```
//!
//! The deployer is the only component that recomputes integrity fields;
//! clients never trust the `sha256` a packager wrote on its own.

use crate::error::{Error, Result};
use crate::filesystem::copy_file;
use crate::fingerprint::is_pkg_path;
use crate::hash::sha256_file;
use crate::manifest::{read_manifest, write_index, write_manifest, Index, IndexEntry};
use chrono::Utc;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Create the standard repository layout under `base_path`
pub fn ensure_repo_dirs(base_path: impl AsRef<Path>) -> Result<()> {
    let base_path = base_path.as_ref();
    for dir in ["channels", "public_keys", "signatures"] {
        let path = base_path.join(dir);
        fs::create_dir_all(&path)
            .map_err(|e| Error::Filesystem(format!("create {}: {e}", path.display())))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .map_err(|e| Error::Filesystem(format!("chmod {}: {e}", path.display())))?;
    }
    Ok(())
}

/// Ensure `channels/<channel>/pkgs/` exists; returns the channel path
pub fn ensure_channel_dirs(base_path: impl AsRef<Path>, channel: &str) -> Result<PathBuf> {
    let channel_path = base_path.as_ref().join("channels").join(channel);
    let pkgs = channel_path.join("pkgs");
    fs::create_dir_all(&pkgs)
        .map_err(|e| Error::Filesystem(format!("create {}: {e}", pkgs.display())))?;
    fs::set_permissions(&pkgs, fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::Filesystem(format!("chmod {}: {e}", pkgs.display())))?;
    Ok(channel_path)
}

/// Archive URL relative to the repository root
fn pkg_url(channel: &str, basename: &str) -> String {
    format!("channels/{channel}/pkgs/{basename}")
}

/// Deploy a `(archive, manifest)` pair into a channel and regenerate the
/// channel index.
///
/// The destination basenames derive from the manifest's fingerprint, not
/// from the source filenames. `size`, `sha256` and `url` are recomputed
/// from the deployed archive before the manifest is written.
pub fn deploy_package(
    base_path: impl AsRef<Path>,
    channel: &str,
    pkg_file: impl AsRef<Path>,
    manifest_file: impl AsRef<Path>,
) -> Result<()> {
    let base_path = base_path.as_ref();
    let (pkg_file, manifest_file) = (pkg_file.as_ref(), manifest_file.as_ref());

    let channel_path = ensure_channel_dirs(base_path, channel)?;
    let pkgs_dir = channel_path.join("pkgs");

    let mut manifest = read_manifest(manifest_file)?;

    if !is_pkg_path(pkg_file) {
        return Err(Error::InvalidInput(format!(
            "not a valid package file: {}",
            pkg_file.display()
        )));
    }

    let fp = manifest.fingerprint();
    let dst_pkg = pkgs_dir.join(fp.pkg_filename());
    let dst_manifest = pkgs_dir.join(fp.manifest_filename());

    copy_file(pkg_file, &dst_pkg)?;

    // recompute integrity fields from the deployed file to be robust
    let size = fs::metadata(&dst_pkg)
        .map_err(|e| Error::Filesystem(format!("stat {}: {e}", dst_pkg.display())))?
        .len();
    let sum = sha256_file(&dst_pkg)?;
    manifest.size = size;
    manifest.sha256 = sum;
    manifest.url = Some(pkg_url(channel, &fp.pkg_filename()));
    write_manifest(&dst_manifest, &manifest)?;

    info!(
        "deployed {} to channel '{}'",
        fp,
        channel
    );

    regenerate_index(base_path, channel)?;
    Ok(())
}

/// Rebuild `channels/<channel>/index.json` from every manifest under
/// `pkgs/`, with a fresh UTC `generated` timestamp.
///
/// Index entries are never edited incrementally; each one is projected
/// from its backing manifest, and the matching `.pkg` is assumed to live
/// under the same basename.
pub fn regenerate_index(base_path: impl AsRef<Path>, channel: &str) -> Result<Index> {
    let base_path = base_path.as_ref();
    let channel_path = base_path.join("channels").join(channel);
    let pkgs_dir = channel_path.join("pkgs");

    let mut entries = Vec::new();
    for entry in WalkDir::new(&pkgs_dir).sort_by_file_name() {
        let entry =
            entry.map_err(|e| Error::Filesystem(format!("walk {}: {e}", pkgs_dir.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let m = read_manifest(path)?;
        let manifest_base = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let pkg_base = format!("{}.pkg", manifest_base.trim_end_matches(".json"));
        debug!("indexing {}", manifest_base);

        entries.push(IndexEntry {
            name: m.name,
            version: m.version,
            arch: m.arch,
            ohos_api: m.ohos_api,
            url: pkg_url(channel, &pkg_base),
            sha256: m.sha256,
            size: m.size,
            manifest: pkg_url(channel, manifest_base),
            depends: m.depends,
        });
    }

    let repo = base_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let index = Index {
        repo,
        channel: channel.to_string(),
        generated: Utc::now(),
        packages: entries,
    };

    write_index(channel_path.join("index.json"), &index)?;
    Ok(index)
}
