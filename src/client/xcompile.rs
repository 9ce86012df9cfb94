// src/client/xcompile.rs

//! Cross-compile driver
//!
//! Builds packages from source in dependency order. The package source
//! repository provides `gen-versions.sh` (regenerates the `VERSION`
//! metadata), one `<name>/BUILD` recipe per package, and `builder.sh`,
//! which receives `--cpu=<arch>` plus the ordered recipe paths.
//! `OHOS_SDK` and `OHOS_CPU` pass through from the invoking shell.

use crate::arch::map_arch_str;
use crate::client::build_order::topological_sort;
use crate::client::config::Config;
use crate::client::srcinfo::{parse_version_file, PackageInfo};
use crate::deps::normalize_dep;
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::process::Command;
use tracing::info;

/// Build the named packages (plus their dependencies) for `arch`.
pub fn xcompile(config: &Config, names: &[String], arch: &str) -> Result<()> {
    let repo = config.pkg_src_repo.as_deref().ok_or_else(|| {
        Error::Config("package source repository for cross compile not configured".to_string())
    })?;
    let arch = map_arch_str(arch)?;

    println!("Cross-compiling for architecture: {arch}");
    println!("Requested packages: {}\n", names.join(", "));

    // regenerate VERSION metadata
    let gen_script = repo.join("gen-versions.sh");
    let output = Command::new(&gen_script)
        .current_dir(repo)
        .output()
        .map_err(|e| Error::Subprocess(format!("run {}: {e}", gen_script.display())))?;
    if !output.status.success() {
        return Err(Error::Subprocess(format!(
            "{} exited with {}; output: {}{}",
            gen_script.display(),
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let version_file = repo.join("VERSION");
    if !version_file.is_file() {
        return Err(Error::NotFound(format!(
            "VERSION file not found at {}; ensure the package source repo is available",
            version_file.display()
        )));
    }

    info!("parsing VERSION file");
    let all_packages = parse_version_file(&version_file)?;
    println!("Found {} packages in VERSION file", all_packages.len());

    let selected = select_with_deps(&all_packages, names)?;
    println!("Selected {} packages (including dependencies)\n", selected.len());

    println!("Computing build order...");
    let order = topological_sort(&selected)?;
    print_build_order(&selected, &order);

    let mut builder = Command::new(repo.join("builder.sh"));
    builder.current_dir(repo).arg(format!("--cpu={arch}"));
    for name in &order {
        builder.arg(repo.join(name).join("BUILD"));
    }

    let status = builder
        .status()
        .map_err(|e| Error::Subprocess(format!("run builder.sh: {e}")))?;
    if !status.success() {
        return Err(Error::Subprocess(format!(
            "builder.sh exited with {status}"
        )));
    }

    println!(
        "Package(s) build success. Output dir: '{}/dist.{arch}.*'",
        repo.display()
    );
    Ok(())
}

/// Recursively collect the requested packages and every runtime/build
/// dependency reachable from them. A requested or referenced name missing
/// from the `VERSION` records is an error.
fn select_with_deps(all: &[PackageInfo], requested: &[String]) -> Result<Vec<PackageInfo>> {
    let by_name: HashMap<&str, &PackageInfo> =
        all.iter().map(|p| (p.name.as_str(), p)).collect();

    let mut selected: Vec<PackageInfo> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    fn visit(
        name: &str,
        by_name: &HashMap<&str, &PackageInfo>,
        seen: &mut HashSet<String>,
        selected: &mut Vec<PackageInfo>,
    ) -> Result<()> {
        if seen.contains(name) {
            return Ok(());
        }
        let pkg = by_name.get(name).ok_or_else(|| {
            Error::NotFound(format!("package not found in VERSION file: {name}"))
        })?;
        seen.insert(name.to_string());
        selected.push((*pkg).clone());

        for dep in pkg.depends.iter().chain(&pkg.build_depends) {
            visit(&normalize_dep(dep), by_name, seen, selected)?;
        }
        Ok(())
    }

    for name in requested {
        visit(name, &by_name, &mut seen, &mut selected)?;
    }
    Ok(selected)
}

/// Print the ordered dependency graph before handing off to the builder
fn print_build_order(packages: &[PackageInfo], order: &[String]) {
    let by_name: HashMap<&str, &PackageInfo> =
        packages.iter().map(|p| (p.name.as_str(), p)).collect();

    println!("\n=== Dependency Graph (Topological Order) ===\n");
    for (i, name) in order.iter().enumerate() {
        let pkg = by_name[name.as_str()];
        println!("{}. {} {}", i + 1, pkg.name, pkg.version);
        if !pkg.depends.is_empty() {
            println!("   Runtime deps: {}", pkg.depends.join(", "));
        }
        if !pkg.build_depends.is_empty() {
            println!("   Build deps:   {}", pkg.build_depends.join(", "));
        }
        println!();
    }
    println!("=== Build order established ===");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str, depends: &[&str], build_depends: &[&str]) -> PackageInfo {
        PackageInfo {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            depends: depends.iter().map(|d| d.to_string()).collect(),
            build_depends: build_depends.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_select_with_deps_transitive() {
        let all = vec![
            pkg("app", &["libfoo >= 1.0"], &["cmake"]),
            pkg("libfoo", &["libz"], &[]),
            pkg("libz", &[], &[]),
            pkg("cmake", &[], &[]),
            pkg("unrelated", &[], &[]),
        ];
        let selected = select_with_deps(&all, &["app".to_string()]).unwrap();
        let names: Vec<&str> = selected.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), 4);
        for n in ["app", "libfoo", "libz", "cmake"] {
            assert!(names.contains(&n));
        }
        assert!(!names.contains(&"unrelated"));
    }

    #[test]
    fn test_select_missing_package() {
        let all = vec![pkg("libfoo", &["ghost"], &[])];
        let err = select_with_deps(&all, &["libfoo".to_string()]).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_xcompile_requires_src_repo() {
        let config = Config::default();
        assert!(matches!(
            xcompile(&config, &["libfoo".to_string()], "aarch64"),
            Err(Error::Config(_))
        ));
    }
}
