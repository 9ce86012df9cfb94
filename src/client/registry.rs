// src/client/registry.rs

//! Installed-package registry
//!
//! A per-user SQLite table recording what is installed where, keyed by
//! `(name, prefix)`. Uninstall depends on it; install into an explicit
//! prefix writes it.

use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One installed-package row
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    pub arch: String,
    pub prefix: PathBuf,
    pub path: PathBuf,
    pub installed_at: DateTime<Utc>,
}

/// Handle to the registry database
pub struct Registry {
    conn: Connection,
}

impl Registry {
    /// Open (creating if needed) the registry at `path` and ensure the
    /// schema. Concurrent writers serialize through a 5-second busy
    /// timeout.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS installed (
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                arch TEXT,
                prefix TEXT NOT NULL,
                path TEXT NOT NULL,
                installed_at DATETIME,
                PRIMARY KEY (name, prefix)
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Record an install, replacing any previous row for `(name, prefix)`
    pub fn insert(
        &self,
        name: &str,
        version: &str,
        arch: &str,
        prefix: &Path,
        path: &Path,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        self.conn.execute(
            "INSERT OR REPLACE INTO installed (name, version, arch, prefix, path, installed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                name,
                version,
                arch,
                prefix.to_string_lossy(),
                path.to_string_lossy(),
                now
            ],
        )?;
        Ok(())
    }

    /// Look up the row for `(name, prefix)`
    pub fn get(&self, name: &str, prefix: &Path) -> Result<Option<InstalledPackage>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, version, arch, prefix, path, installed_at
             FROM installed WHERE name = ?1 AND prefix = ?2",
        )?;
        let row = stmt
            .query_row(params![name, prefix.to_string_lossy()], |row| {
                let installed_at: String = row.get(5)?;
                Ok(InstalledPackage {
                    name: row.get(0)?,
                    version: row.get(1)?,
                    arch: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    prefix: PathBuf::from(row.get::<_, String>(3)?),
                    path: PathBuf::from(row.get::<_, String>(4)?),
                    installed_at: DateTime::parse_from_rfc3339(&installed_at)
                        .map(|t| t.with_timezone(&Utc))
                        .unwrap_or_default(),
                })
            })
            .optional()?;
        Ok(row)
    }

    /// Remove the row for `(name, prefix)`
    pub fn delete(&self, name: &str, prefix: &Path) -> Result<()> {
        self.conn.execute(
            "DELETE FROM installed WHERE name = ?1 AND prefix = ?2",
            params![name, prefix.to_string_lossy()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("installed.db")).unwrap();

        let prefix = Path::new("/opt/p");
        registry
            .insert("libfoo", "1.2.3", "aarch64", prefix, &prefix.join("libfoo"))
            .unwrap();

        let row = registry.get("libfoo", prefix).unwrap().unwrap();
        assert_eq!(row.version, "1.2.3");
        assert_eq!(row.arch, "aarch64");
        assert_eq!(row.path, PathBuf::from("/opt/p/libfoo"));
        assert!(row.installed_at > DateTime::<Utc>::default());

        registry.delete("libfoo", prefix).unwrap();
        assert!(registry.get("libfoo", prefix).unwrap().is_none());
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("installed.db")).unwrap();
        let prefix = Path::new("/opt/p");

        registry
            .insert("libfoo", "1.0.0", "arm", prefix, &prefix.join("libfoo"))
            .unwrap();
        registry
            .insert("libfoo", "2.0.0", "arm", prefix, &prefix.join("libfoo"))
            .unwrap();

        let row = registry.get("libfoo", prefix).unwrap().unwrap();
        assert_eq!(row.version, "2.0.0");
    }

    #[test]
    fn test_distinct_prefixes_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("installed.db")).unwrap();

        registry
            .insert("libfoo", "1.0.0", "arm", Path::new("/a"), Path::new("/a/libfoo"))
            .unwrap();
        registry
            .insert("libfoo", "2.0.0", "arm", Path::new("/b"), Path::new("/b/libfoo"))
            .unwrap();

        assert_eq!(
            registry.get("libfoo", Path::new("/a")).unwrap().unwrap().version,
            "1.0.0"
        );
        assert_eq!(
            registry.get("libfoo", Path::new("/b")).unwrap().unwrap().version,
            "2.0.0"
        );
    }

    #[test]
    fn test_get_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("installed.db")).unwrap();
        assert!(registry.get("ghost", Path::new("/p")).unwrap().is_none());
    }
}
