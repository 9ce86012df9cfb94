// src/error.rs

//! Error taxonomy shared across the packager, repository tool and client.
//!
//! Every variant carries enough context (path, name, version, constraint set)
//! for the user to diagnose a failure from the message alone.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed name, version, dependency string, URL or architecture
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Missing file, or package absent from the channel index
    #[error("not found: {0}")]
    NotFound(String),

    /// SHA-256 disagreement between an archive and its manifest
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// No candidate version satisfies the accumulated constraints and API
    #[error("no version of {name} satisfies constraints [{constraints}] and SDK API {api}")]
    Unsatisfiable {
        name: String,
        constraints: String,
        api: String,
    },

    /// Dependency cycle in the build graph; the message renders the path
    #[error("circular dependency detected:\n{0}")]
    Cycle(String),

    /// I/O failure or path nesting violation
    #[error("filesystem error: {0}")]
    Filesystem(String),

    /// HTTP non-2xx status or transport failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Post-install hook or builder exited non-zero
    #[error("subprocess failed: {0}")]
    Subprocess(String),

    /// Missing or invalid client configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Filesystem(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidInput(format!("malformed JSON: {e}"))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Filesystem(format!("registry database: {e}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
