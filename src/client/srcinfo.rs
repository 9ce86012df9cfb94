// src/client/srcinfo.rs

//! Package source records for cross-compilation
//!
//! The package source repository carries a whitespace-delimited `VERSION`
//! file, one package per line:
//!
//! ```text
//! # name  version  depends            build_depends
//! libfoo  1.2.3    libz>=1.2,openssl  cmake
//! libz    1.2.11
//! ```
//!
//! Fields three and four are comma-separated dependency lists; a line with
//! fewer than two fields is an error.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// One package as declared in the source repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    /// Runtime dependency strings, constraints included
    pub depends: Vec<String>,
    /// Build-time dependency strings
    pub build_depends: Vec<String>,
}

/// Parse a `VERSION` file into package records
pub fn parse_version_file(path: impl AsRef<Path>) -> Result<Vec<PackageInfo>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Filesystem(format!("read {}: {e}", path.display())))?;

    let mut packages = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "{}:{}: expected at least name and version, got '{line}'",
                path.display(),
                lineno + 1
            )));
        }

        packages.push(PackageInfo {
            name: fields[0].to_string(),
            version: fields[1].to_string(),
            depends: split_dep_list(fields.get(2).copied().unwrap_or("")),
            build_depends: split_dep_list(fields.get(3).copied().unwrap_or("")),
        });
    }
    Ok(packages)
}

fn split_dep_list(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("VERSION");
        fs::write(
            &path,
            "# comment line\n\
             libfoo 1.2.3 libz>=1.2,openssl cmake\n\
             \n\
             libz 1.2.11\n\
             openssl 3.0.0 libz\n",
        )
        .unwrap();

        let pkgs = parse_version_file(&path).unwrap();
        assert_eq!(pkgs.len(), 3);
        assert_eq!(pkgs[0].name, "libfoo");
        assert_eq!(pkgs[0].depends, vec!["libz>=1.2", "openssl"]);
        assert_eq!(pkgs[0].build_depends, vec!["cmake"]);
        assert!(pkgs[1].depends.is_empty());
        assert!(pkgs[1].build_depends.is_empty());
        assert_eq!(pkgs[2].depends, vec!["libz"]);
    }

    #[test]
    fn test_short_line_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("VERSION");
        fs::write(&path, "libfoo 1.0\nonly-a-name\n").unwrap();

        let err = parse_version_file(&path).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }

    #[test]
    fn test_missing_file() {
        assert!(parse_version_file("/nonexistent/VERSION").is_err());
    }
}
