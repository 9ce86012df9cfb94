// tests/deploy.rs

//! Package-then-deploy end-to-end: pkgtool core followed by the repository
//! deployer, checking the deploy invariants on the resulting channel.

use ohpkg::hash::sha256_file;
use ohpkg::manifest::{read_index, read_manifest};
use ohpkg::packager::build_package;
use ohpkg::repo::{deploy_package, ensure_repo_dirs};
use std::fs;
use std::path::{Path, PathBuf};

fn make_payload(root: &Path) -> PathBuf {
    let payload = root.join("payload");
    fs::create_dir_all(payload.join("lib/aarch64-linux-ohos")).unwrap();
    fs::create_dir_all(payload.join("include")).unwrap();
    fs::write(payload.join("lib/aarch64-linux-ohos/libfoo.so"), vec![0u8; 12]).unwrap();
    fs::write(payload.join("include/foo.h"), "#pragma once\n").unwrap();
    payload
}

#[test]
fn package_then_deploy() {
    let dir = tempfile::tempdir().unwrap();
    let payload = make_payload(dir.path());
    let out = dir.path().join("out");

    let (pkg, manifest) = build_package(
        &payload,
        &out,
        "libfoo",
        "1.2.3",
        "arm64-v8a",
        "15",
        &["libz >= 1.2".to_string()],
        true,
    )
    .unwrap();

    assert!(out.join("libfoo-1.2.3-aarch64-api15.pkg").is_file());
    assert!(out.join("libfoo-1.2.3-aarch64-api15.json").is_file());

    let m = read_manifest(&manifest).unwrap();
    assert_eq!(m.arch, "aarch64");
    assert_eq!(m.depends, vec!["libz >= 1.2"]);
    assert_eq!(m.sha256, sha256_file(&pkg).unwrap());

    let repo = dir.path().join("repo");
    ensure_repo_dirs(&repo).unwrap();
    deploy_package(&repo, "stable", &pkg, &manifest).unwrap();

    let index = read_index(repo.join("channels/stable/index.json")).unwrap();
    assert_eq!(index.packages.len(), 1);
    assert_eq!(
        index.packages[0].url,
        "channels/stable/pkgs/libfoo-1.2.3-aarch64-api15.pkg"
    );
    assert_eq!(index.channel, "stable");
    assert_eq!(index.repo, "repo");
}

#[test]
fn deploy_recomputes_integrity_fields() {
    let dir = tempfile::tempdir().unwrap();
    let payload = make_payload(dir.path());
    let out = dir.path().join("out");

    let (pkg, manifest_path) =
        build_package(&payload, &out, "libfoo", "1.0.0", "aarch64", "15", &[], true).unwrap();

    // corrupt the packager-written integrity fields; the deployer must not
    // trust them
    let mut m = read_manifest(&manifest_path).unwrap();
    m.sha256 = "0".repeat(64);
    m.size = 1;
    ohpkg::manifest::write_manifest(&manifest_path, &m).unwrap();

    let repo = dir.path().join("repo");
    deploy_package(&repo, "stable", &pkg, &manifest_path).unwrap();

    let deployed_pkg = repo.join("channels/stable/pkgs/libfoo-1.0.0-aarch64-api15.pkg");
    let deployed_manifest = repo.join("channels/stable/pkgs/libfoo-1.0.0-aarch64-api15.json");
    let deployed = read_manifest(&deployed_manifest).unwrap();

    assert_eq!(deployed.sha256, sha256_file(&deployed_pkg).unwrap());
    assert_eq!(deployed.size, fs::metadata(&deployed_pkg).unwrap().len());
    assert_eq!(
        deployed.url.as_deref(),
        Some("channels/stable/pkgs/libfoo-1.0.0-aarch64-api15.pkg")
    );
}

#[test]
fn index_has_one_entry_per_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let payload = make_payload(dir.path());
    let out = dir.path().join("out");
    let repo = dir.path().join("repo");

    for (name, version) in [("libfoo", "1.0.0"), ("libfoo", "1.2.0"), ("libbar", "0.9.0")] {
        let (pkg, manifest) =
            build_package(&payload, &out, name, version, "aarch64", "15", &[], true).unwrap();
        deploy_package(&repo, "stable", &pkg, &manifest).unwrap();
    }

    let pkgs_dir = repo.join("channels/stable/pkgs");
    let manifest_count = fs::read_dir(&pkgs_dir)
        .unwrap()
        .filter(|e| {
            e.as_ref().unwrap().path().extension().map(|x| x == "json").unwrap_or(false)
        })
        .count();
    assert_eq!(manifest_count, 3);

    let index = read_index(repo.join("channels/stable/index.json")).unwrap();
    assert_eq!(index.packages.len(), 3);

    // every entry's archive exists under the same basename
    for entry in &index.packages {
        assert!(repo.join(&entry.url).is_file(), "missing {}", entry.url);
        assert!(repo.join(&entry.manifest).is_file());
    }
}

#[test]
fn redeploy_overwrites_rather_than_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let payload = make_payload(dir.path());
    let out = dir.path().join("out");
    let repo = dir.path().join("repo");

    let (pkg, manifest) =
        build_package(&payload, &out, "libfoo", "1.0.0", "aarch64", "15", &[], true).unwrap();
    deploy_package(&repo, "stable", &pkg, &manifest).unwrap();
    deploy_package(&repo, "stable", &pkg, &manifest).unwrap();

    let index = read_index(repo.join("channels/stable/index.json")).unwrap();
    assert_eq!(index.packages.len(), 1);
}

#[test]
fn channels_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let payload = make_payload(dir.path());
    let out = dir.path().join("out");
    let repo = dir.path().join("repo");

    let (pkg, manifest) =
        build_package(&payload, &out, "libfoo", "1.0.0", "aarch64", "15", &[], true).unwrap();
    deploy_package(&repo, "stable", &pkg, &manifest).unwrap();
    deploy_package(&repo, "testing", &pkg, &manifest).unwrap();

    let stable = read_index(repo.join("channels/stable/index.json")).unwrap();
    let testing = read_index(repo.join("channels/testing/index.json")).unwrap();
    assert_eq!(stable.packages.len(), 1);
    assert_eq!(testing.packages.len(), 1);
    assert!(testing.packages[0].url.starts_with("channels/testing/"));
}

#[test]
fn deploy_rejects_non_pkg_file() {
    let dir = tempfile::tempdir().unwrap();
    let payload = make_payload(dir.path());
    let out = dir.path().join("out");
    let repo = dir.path().join("repo");

    let (_pkg, manifest) =
        build_package(&payload, &out, "libfoo", "1.0.0", "aarch64", "15", &[], true).unwrap();

    let not_pkg = dir.path().join("archive.tar.gz");
    fs::write(&not_pkg, "x").unwrap();
    assert!(deploy_package(&repo, "stable", &not_pkg, &manifest).is_err());
}
