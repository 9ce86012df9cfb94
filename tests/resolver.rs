// tests/resolver.rs

//! Resolver scenarios over an index produced by the real deployer.

use ohpkg::client::resolver::resolve;
use ohpkg::packager::build_package;
use ohpkg::repo::deploy_package;
use ohpkg::manifest::read_index;
use ohpkg::Error;
use std::fs;
use std::path::{Path, PathBuf};

fn deploy_version(
    root: &Path,
    repo: &Path,
    name: &str,
    version: &str,
    api: &str,
    depends: &[String],
) {
    let payload = root.join(format!("payload-{name}-{version}"));
    fs::create_dir_all(payload.join("lib/aarch64-linux-ohos")).unwrap();
    fs::create_dir_all(payload.join("include")).unwrap();
    fs::write(
        payload.join("lib/aarch64-linux-ohos").join(format!("{name}.so")),
        version.as_bytes(),
    )
    .unwrap();
    fs::write(payload.join("include/h.h"), "x").unwrap();

    let out = root.join("out");
    let (pkg, manifest) =
        build_package(&payload, &out, name, version, "aarch64", api, depends, true).unwrap();
    deploy_package(repo, "stable", &pkg, &manifest).unwrap();
}

fn repo_index(repo: &Path) -> ohpkg::Index {
    read_index(repo.join("channels/stable/index.json")).unwrap()
}

#[test]
fn resolver_selects_latest_satisfying_version() {
    let dir = tempfile::tempdir().unwrap();
    let repo: PathBuf = dir.path().join("repo");

    for version in ["1.0.0", "1.2.0", "2.0.0"] {
        deploy_version(dir.path(), &repo, "libfoo", version, "15", &[]);
    }

    let chosen = resolve(
        &repo_index(&repo),
        &["libfoo >= 1.1".to_string(), "libfoo < 2.0".to_string()],
        "aarch64",
        "15",
    )
    .unwrap();
    assert_eq!(chosen.len(), 1);
    assert_eq!(chosen["libfoo"].version, "1.2.0");
}

#[test]
fn resolver_rejects_api_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let repo: PathBuf = dir.path().join("repo");

    deploy_version(dir.path(), &repo, "libfoo", "1.0.0", "14", &[]);
    deploy_version(dir.path(), &repo, "libfoo", "1.2.0", "14", &[]);
    deploy_version(dir.path(), &repo, "libfoo", "2.0.0", "15", &[]);

    let err = resolve(
        &repo_index(&repo),
        &["libfoo < 2.0".to_string()],
        "aarch64",
        "15",
    )
    .unwrap_err();
    match err {
        Error::Unsatisfiable {
            name,
            constraints,
            api,
        } => {
            assert_eq!(name, "libfoo");
            assert!(constraints.contains("< 2.0"));
            assert_eq!(api, "15");
        }
        other => panic!("expected Unsatisfiable, got {other:?}"),
    }
}

#[test]
fn resolver_walks_declared_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let repo: PathBuf = dir.path().join("repo");

    deploy_version(dir.path(), &repo, "libz", "1.2.11", "15", &[]);
    deploy_version(dir.path(), &repo, "libz", "1.1.0", "15", &[]);
    deploy_version(
        dir.path(),
        &repo,
        "libfoo",
        "1.0.0",
        "15",
        &["libz >= 1.2".to_string()],
    );

    let chosen = resolve(&repo_index(&repo), &["libfoo".to_string()], "aarch64", "15").unwrap();
    assert_eq!(chosen.len(), 2);
    assert_eq!(chosen["libz"].version, "1.2.11");
}

#[test]
fn resolver_reports_missing_name() {
    let dir = tempfile::tempdir().unwrap();
    let repo: PathBuf = dir.path().join("repo");
    deploy_version(dir.path(), &repo, "libfoo", "1.0.0", "15", &[]);

    match resolve(&repo_index(&repo), &["ghost".to_string()], "aarch64", "15") {
        Err(Error::NotFound(msg)) => assert!(msg.contains("ghost")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}
