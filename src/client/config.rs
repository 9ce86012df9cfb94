// src/client/config.rs

//! Persistent client configuration
//!
//! Lives at `<confdir>/config.json` where `<confdir>` is
//! `$XDG_CONFIG_HOME/oh_pkgmgr` (or `$HOME/.config/oh_pkgmgr`). The cache
//! directory and the installed-package registry live alongside it.

use crate::error::{Error, Result};
use crate::manifest::write_json_pretty;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed configuration subdirectory name
pub const CONFIG_DIR_NAME: &str = "oh_pkgmgr";

/// Client configuration persisted on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub root_url: String,
    pub cur_arch: String,
    /// Absolute path of the local SDK
    pub ohos_sdk: PathBuf,
    pub channel: String,
    /// Package source repository, for cross-compiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkg_src_repo: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_url: String::new(),
            cur_arch: String::new(),
            ohos_sdk: PathBuf::new(),
            channel: "stable".to_string(),
            pkg_src_repo: None,
        }
    }
}

impl Config {
    /// Load the configuration from `path`; a missing file is a
    /// configuration error directing the user to `config`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Config(
                "no client configuration found; run 'config' first".to_string(),
            ));
        }
        let bytes = fs::read(path)
            .map_err(|e| Error::Filesystem(format!("read config {}: {e}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Config(format!("malformed config {}: {e}", path.display())))
    }

    /// Persist the configuration, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Filesystem(format!("create {}: {e}", parent.display())))?;
        }
        write_json_pretty(path, self)
    }
}

/// The client's configuration directory
pub fn config_dir() -> PathBuf {
    let base = match env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir().unwrap_or_default().join(".config"),
    };
    base.join(CONFIG_DIR_NAME)
}

/// Default path of the configuration file
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Download cache directory
pub fn cache_dir() -> PathBuf {
    config_dir().join("cache")
}

/// Installed-package registry path
pub fn registry_path() -> PathBuf {
    config_dir().join("installed.db")
}

/// The architecture used when no `--arch` flag is given: the configured
/// default, falling back to the host architecture.
pub fn default_arch(config: &Config) -> String {
    if !config.cur_arch.is_empty() {
        return config.cur_arch.clone();
    }
    env::consts::ARCH.to_string()
}

/// Minimal scheme/host validation for the repository root URL
pub fn is_valid_http_url(url: &str) -> bool {
    let rest = if let Some(r) = url.strip_prefix("https://") {
        r
    } else if let Some(r) = url.strip_prefix("http://") {
        r
    } else {
        return false;
    };
    let host = rest.split('/').next().unwrap_or("");
    !host.is_empty()
}
