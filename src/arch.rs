// src/arch.rs

//! Canonical architecture identifiers and their accepted aliases.
//!
//! Package fingerprints, manifests and index entries always carry the
//! canonical label; user input (CLI flags, config, payload checks) is mapped
//! through [`Arch::parse`] first.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A canonical target architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Aarch64,
    Arm,
    X86_64,
}

impl Arch {
    /// Map an input string (case-insensitive, aliases allowed) to its
    /// canonical architecture.
    ///
    /// Accepted aliases:
    /// - `arm64`, `aarch64`, `armv8a`, `arm64v8a`, `arm64-v8a` → `aarch64`
    /// - `arm`, `armeabi-v7a`, `armv7-a`, `armv7a` → `arm`
    /// - `x86_64`, `amd64` → `x86_64`
    pub fn parse(input: &str) -> Result<Self> {
        match input.to_lowercase().as_str() {
            "arm64" | "aarch64" | "armv8a" | "arm64v8a" | "arm64-v8a" => Ok(Self::Aarch64),
            "arm" | "armeabi-v7a" | "armv7-a" | "armv7a" => Ok(Self::Arm),
            "x86_64" | "amd64" => Ok(Self::X86_64),
            _ => Err(Error::InvalidInput(format!(
                "unsupported architecture: '{input}'"
            ))),
        }
    }

    /// Canonical label, as stored in manifests and filenames
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Aarch64 => "aarch64",
            Self::Arm => "arm",
            Self::X86_64 => "x86_64",
        }
    }

    /// Relative path of the arch-dependent library directory under a prefix
    pub fn dep_libdir(&self) -> String {
        format!("lib/{}-linux-ohos", self.as_str())
    }
}

/// Relative path of the arch-independent library directory under a prefix
pub const INDEP_LIBDIR: &str = "lib";

/// Relative path of the shared resources directory under a prefix
pub const SHARE_DIR: &str = "share";

/// Canonicalize an architecture string, returning the canonical label.
pub fn map_arch_str(input: &str) -> Result<String> {
    Ok(Arch::parse(input)?.as_str().to_string())
}

/// True when the basename marks an arch-dependent library (`.so` / `.a`)
pub fn is_arch_dependent_lib(path: &std::path::Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(".so") || n.ends_with(".a"))
        .unwrap_or(false)
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
