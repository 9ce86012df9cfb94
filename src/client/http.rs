// src/client/http.rs

//! HTTP transport for the client
//!
//! The client depends on the [`Transport`] trait only; the blocking
//! reqwest implementation lives behind it, so tests can swap in an
//! in-memory transport.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default timeout for HTTP requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Opaque fetch capability the client pipeline is written against
pub trait Transport {
    /// Fetch a URL into memory; any HTTP status >= 400 is an error
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Download a URL to `dest`, creating parent directories
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let bytes = self.fetch(url)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Filesystem(format!("create {}: {e}", parent.display())))?;
        }
        fs::write(dest, bytes)
            .map_err(|e| Error::Filesystem(format!("write {}: {e}", dest.display())))?;
        Ok(())
    }
}

/// Blocking reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::Transport(format!("failed to fetch {url}: {e}")))?;
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::Transport(format!("HTTP {status} fetching {url}")));
        }
        let bytes = response
            .bytes()
            .map_err(|e| Error::Transport(format!("failed to read response from {url}: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!("downloading {} to {}", url, dest.display());

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Filesystem(format!("create {}: {e}", parent.display())))?;
        }

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::Transport(format!("failed to fetch {url}: {e}")))?;
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::Transport(format!("HTTP {status} fetching {url}")));
        }

        // stream through a temp file, then rename into place
        let temp_path = dest.with_extension("part");
        let mut file = File::create(&temp_path)
            .map_err(|e| Error::Filesystem(format!("create {}: {e}", temp_path.display())))?;
        io::copy(&mut response, &mut file)
            .map_err(|e| Error::Filesystem(format!("write {}: {e}", temp_path.display())))?;
        fs::rename(&temp_path, dest).map_err(|e| {
            Error::Filesystem(format!(
                "rename {} to {}: {e}",
                temp_path.display(),
                dest.display()
            ))
        })?;
        Ok(())
    }
}

/// Join a base URL and a repository-relative path
pub fn join_url(base: &str, rel: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        rel.trim_start_matches('/')
    )
}
