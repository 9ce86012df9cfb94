// src/fingerprint.rs

//! Package fingerprints: the `(name, version, arch, api)` tuple that
//! addresses a package globally.
//!
//! Textual form is `name-version-arch-apiN`; the name may itself contain
//! `-`, so the last three fields are parsed from the right.

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

/// Identifies one package within a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub name: String,
    pub version: String,
    /// Canonical architecture label
    pub arch: String,
    /// SDK API level, decimal digits
    pub api: String,
}

impl Fingerprint {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        arch: impl Into<String>,
        api: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            arch: arch.into(),
            api: api.into(),
        }
    }

    /// Archive basename, e.g. `libfoo-1.2.3-aarch64-api15.pkg`
    pub fn pkg_filename(&self) -> String {
        format!("{self}.pkg")
    }

    /// Manifest basename, e.g. `libfoo-1.2.3-aarch64-api15.json`
    pub fn manifest_filename(&self) -> String {
        format!("{self}.json")
    }

    /// Parse a fingerprint from a package or manifest path.
    ///
    /// The basename is stripped of its (final) extension and split on `-`;
    /// the last three tokens are version, arch and `api<N>`, everything
    /// before them is the name.
    pub fn parse_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let basename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidInput(format!("invalid path: '{}'", path.display())))?;
        let stem = match basename.rfind('.') {
            Some(dot) => &basename[..dot],
            None => basename,
        };

        let tokens: Vec<&str> = stem.split('-').collect();
        if tokens.len() < 4 {
            return Err(Error::InvalidInput(format!(
                "invalid package name: '{basename}'"
            )));
        }

        let api_token = tokens[tokens.len() - 1];
        let api = api_token.strip_prefix("api").ok_or_else(|| {
            Error::InvalidInput(format!(
                "invalid package name: '{basename}' (expected trailing api<N>)"
            ))
        })?;
        let arch = tokens[tokens.len() - 2];
        let version = tokens[tokens.len() - 3];
        let name = tokens[..tokens.len() - 3].join("-");

        Ok(Self::new(name, version, arch, api))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-api{}",
            self.name, self.version, self.arch, self.api
        )
    }
}

/// True when the path names an existing regular file with a `.pkg` extension
pub fn is_pkg_path(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    path.extension().map(|e| e == "pkg").unwrap_or(false) && path.is_file()
}
