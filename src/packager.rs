// src/packager.rs

//! Payload validation and package building (the `pkgtool` core)
//!
//! Turns a payload directory into a `.pkg` archive plus the manifest
//! describing it. All inputs are validated up front; the payload tree is
//! checked for arch-dependent libraries leaking into the arch-independent
//! library directory.

use crate::arch::{is_arch_dependent_lib, Arch};
use crate::components::{postinst_path, INSTALL_EXCLUDED};
use crate::deps::{parse_dep, validate_pkg_name};
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::hash::sha256_file;
use crate::manifest::{write_manifest, Manifest, FORMAT_VERSION};
use crate::version::parse_tolerant;
use crate::archive::create_archive;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Build a package archive and manifest from `payload_dir` into `out_dir`.
///
/// With `archlib_isolation` (the default), an arch-dependent library found
/// directly under the arch-independent `lib/` is fatal; without it, the
/// finding is downgraded to a warning.
///
/// Returns the `(archive, manifest)` paths.
#[allow(clippy::too_many_arguments)]
pub fn build_package(
    payload_dir: &Path,
    out_dir: &Path,
    name: &str,
    version: &str,
    arch: &str,
    api: &str,
    depends: &[String],
    archlib_isolation: bool,
) -> Result<(PathBuf, PathBuf)> {
    if fs::metadata(payload_dir).is_err() {
        return Err(Error::NotFound(format!(
            "payload directory '{}' not found",
            payload_dir.display()
        )));
    }
    fs::create_dir_all(out_dir)
        .map_err(|e| Error::Filesystem(format!("create {}: {e}", out_dir.display())))?;

    validate_pkg_name(name)?;
    parse_tolerant(version)
        .map_err(|_| Error::InvalidInput(format!("invalid version '{version}'")))?;
    let arch = Arch::parse(arch)?;
    if api.is_empty() || !api.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!(
            "invalid SDK API version: '{api}'"
        )));
    }
    for dep in depends {
        parse_dep(dep)?;
    }

    let fp = Fingerprint::new(name, version, arch.as_str(), api);
    let pkg_path = out_dir.join(fp.pkg_filename());
    let manifest_path = out_dir.join(fp.manifest_filename());

    check_payload_tree(payload_dir, arch, archlib_isolation)?;

    if postinst_path(payload_dir).is_some() {
        info!("post-installation script detected");
    }

    create_archive(payload_dir, &pkg_path, &[], INSTALL_EXCLUDED)?;

    let sum = sha256_file(&pkg_path)?;
    let size = fs::metadata(&pkg_path)
        .map_err(|e| Error::Filesystem(format!("stat {}: {e}", pkg_path.display())))?
        .len();

    let manifest = Manifest {
        name: name.to_string(),
        version: version.to_string(),
        arch: arch.as_str().to_string(),
        ohos_api: api.to_string(),
        format_version: FORMAT_VERSION,
        summary: None,
        description: None,
        maintainer: None,
        license: None,
        size,
        sha256: sum,
        url: None,
        provides: Vec::new(),
        depends: depends.to_vec(),
        relocatable: false,
        install_prefix: None,
    };
    write_manifest(&manifest_path, &manifest)?;

    Ok((pkg_path, manifest_path))
}

/// Validate the payload directory layout for the target architecture.
fn check_payload_tree(payload_dir: &Path, arch: Arch, archlib_isolation: bool) -> Result<()> {
    let indep_libdir = payload_dir.join("lib");
    let dep_libdir = payload_dir.join(arch.dep_libdir());
    let libexec_dir = payload_dir.join("libexec");

    if indep_libdir.is_dir() {
        let entries = fs::read_dir(&indep_libdir).map_err(|e| {
            Error::Filesystem(format!("read dir {}: {e}", indep_libdir.display()))
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::Filesystem(format!("read dir {}: {e}", indep_libdir.display()))
            })?;
            // arch-dependent libraries living in their own subdirectory
            // (python-style) are fine; only direct children count
            if entry.path().is_dir() {
                continue;
            }
            if is_arch_dependent_lib(&entry.path()) {
                let msg = "architecture-specific library files were compiled and installed \
                           in an architecture-independent directory, which will cause \
                           architecture conflicts when the library is installed into an SDK";
                if archlib_isolation {
                    return Err(Error::InvalidInput(format!(
                        "{msg}. Check the --libdir used during compilation, or rerun with \
                         --no-archlib-isolation"
                    )));
                }
                warn!("{msg}");
                break;
            }
        }

        if !dep_libdir.is_dir() {
            warn!("architecture-dependent libraries not found for this package");
        }
    } else {
        warn!("libraries not found for this package");
    }

    if libexec_dir.is_dir() {
        warn!("executable libraries will be ignored in this package");
    }

    Ok(())
}
