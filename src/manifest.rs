// src/manifest.rs

//! Manifest and index data model
//!
//! Manifests describe one package archive; a channel index enumerates every
//! package in a channel and is the sole document the client resolver
//! consumes. Both persist as pretty-printed JSON (two-space indent, mode
//! 0o644) with snake_case field names.

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Manifest format generation written by this crate
pub const FORMAT_VERSION: u32 = 1;

/// Describes one package archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub arch: String,
    pub ohos_api: String,
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Byte length of the archive (not the payload)
    pub size: u64,
    /// Lowercase hex SHA-256 of the archive
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub relocatable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_prefix: Option<String>,
}

impl Manifest {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(&self.name, &self.version, &self.arch, &self.ohos_api)
    }
}

/// One package as projected into a channel index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub version: String,
    pub arch: String,
    pub ohos_api: String,
    /// Archive path relative to the repository root
    pub url: String,
    pub sha256: String,
    pub size: u64,
    /// Manifest path relative to the repository root
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manifest: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
}

/// The channel index: every package in one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    pub generated: DateTime<Utc>,
    pub packages: Vec<IndexEntry>,
}

/// Local SDK metadata, read from `<sdk>/toolchains/oh-uni-package.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkInfo {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
}

/// Read a manifest from disk, rejecting structurally invalid JSON
pub fn read_manifest(path: impl AsRef<Path>) -> Result<Manifest> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .map_err(|e| Error::Filesystem(format!("read manifest {}: {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidInput(format!("malformed manifest {}: {e}", path.display())))
}

/// Write a manifest, pretty-printed, mode 0o644
pub fn write_manifest(path: impl AsRef<Path>, manifest: &Manifest) -> Result<()> {
    write_json_pretty(path.as_ref(), manifest)
}

/// Read a channel index from disk
pub fn read_index(path: impl AsRef<Path>) -> Result<Index> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .map_err(|e| Error::Filesystem(format!("read index {}: {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidInput(format!("malformed index {}: {e}", path.display())))
}

/// Write a channel index, pretty-printed, mode 0o644
pub fn write_index(path: impl AsRef<Path>, index: &Index) -> Result<()> {
    write_json_pretty(path.as_ref(), index)
}

/// Load SDK metadata; the `apiVersion` field is required
pub fn load_sdk_info(sdk_path: impl AsRef<Path>) -> Result<SdkInfo> {
    let info_path = sdk_path
        .as_ref()
        .join("toolchains")
        .join("oh-uni-package.json");
    if !info_path.is_file() {
        return Err(Error::Config(format!(
            "invalid SDK directory tree: '{}' not found",
            info_path.display()
        )));
    }
    let bytes = fs::read(&info_path)
        .map_err(|e| Error::Filesystem(format!("read SDK info {}: {e}", info_path.display())))?;
    let info: SdkInfo = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Config(format!("parse SDK info {}: {e}", info_path.display())))?;
    if info.api_version.is_empty() {
        return Err(Error::Config(format!(
            "SDK info {} is missing apiVersion",
            info_path.display()
        )));
    }
    Ok(info)
}

/// Serialize a value as two-space-indented JSON at `path` with mode 0o644
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .map_err(|e| Error::Filesystem(format!("write {}: {e}", path.display())))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
        .map_err(|e| Error::Filesystem(format!("chmod {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest() -> Manifest {
        Manifest {
            name: "libfoo".to_string(),
            version: "1.2.3".to_string(),
            arch: "aarch64".to_string(),
            ohos_api: "15".to_string(),
            format_version: FORMAT_VERSION,
            summary: None,
            description: None,
            maintainer: None,
            license: None,
            size: 42,
            sha256: "ab".repeat(32),
            url: None,
            provides: Vec::new(),
            depends: vec!["libz >= 1.2".to_string()],
            relocatable: false,
            install_prefix: None,
        }
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        let m = sample_manifest();
        write_manifest(&path, &m).unwrap();

        let read = read_manifest(&path).unwrap();
        assert_eq!(read.name, "libfoo");
        assert_eq!(read.depends, vec!["libz >= 1.2"]);
        assert_eq!(read.fingerprint().to_string(), "libfoo-1.2.3-aarch64-api15");

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let json = serde_json::to_string_pretty(&sample_manifest()).unwrap();
        assert!(!json.contains("summary"));
        assert!(!json.contains("provides"));
        assert!(!json.contains("relocatable"));
        assert!(!json.contains("\"url\""));
        // two-space indentation
        assert!(json.contains("\n  \"name\""));
    }

    #[test]
    fn test_read_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(read_manifest(&path).is_err());
        assert!(read_index(&path).is_err());
    }

    #[test]
    fn test_read_rejects_missing_required_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, br#"{"name": "x", "version": "1.0"}"#).unwrap();
        assert!(read_manifest(&path).is_err());
    }

    #[test]
    fn test_sdk_info() {
        let dir = tempfile::tempdir().unwrap();
        let toolchains = dir.path().join("toolchains");
        fs::create_dir_all(&toolchains).unwrap();
        fs::write(
            toolchains.join("oh-uni-package.json"),
            br#"{"apiVersion": "15", "path": "toolchains"}"#,
        )
        .unwrap();
        let info = load_sdk_info(dir.path()).unwrap();
        assert_eq!(info.api_version, "15");
    }

    #[test]
    fn test_sdk_info_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_sdk_info(dir.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_index_generated_is_rfc3339() {
        let idx = Index {
            repo: "repo".to_string(),
            channel: "stable".to_string(),
            generated: Utc::now(),
            packages: Vec::new(),
        };
        let json = serde_json::to_string(&idx).unwrap();
        assert!(json.contains("\"generated\":\"2"));
    }
}
