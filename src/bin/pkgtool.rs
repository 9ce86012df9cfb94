// src/bin/pkgtool.rs
//! Packager CLI: create a `.pkg` archive and manifest from a payload tree

use anyhow::Result;
use clap::Parser;
use ohpkg::packager::build_package;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pkgtool")]
#[command(about = "Create a package (.pkg) and manifest from a payload directory")]
struct Cli {
    /// Package payload directory (to be packaged)
    #[arg(short = 'i', long)]
    payload: PathBuf,

    /// Output directory for .pkg and manifest
    #[arg(short = 'o', long, default_value = ".")]
    out: PathBuf,

    /// Target architecture (e.g. aarch64, arm, x86_64)
    #[arg(short = 'a', long)]
    arch: String,

    /// Target SDK API level (e.g. 12, 14, 15)
    #[arg(long)]
    api: String,

    /// Package name
    #[arg(short = 'n', long)]
    name: String,

    /// Package version
    #[arg(short = 'v', long)]
    version: String,

    /// Dependency (repeatable, comma-separable), e.g. "libz>=1.2.11"
    #[arg(long = "depends")]
    depends: Vec<String>,

    /// Allow arch-specific libraries in the arch-independent directory
    #[arg(long = "no-archlib-isolation")]
    no_archlib_isolation: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let depends: Vec<String> = cli
        .depends
        .iter()
        .flat_map(|raw| raw.split(','))
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();

    let (pkg, manifest) = build_package(
        &cli.payload,
        &cli.out,
        &cli.name,
        &cli.version,
        &cli.arch,
        &cli.api,
        &depends,
        !cli.no_archlib_isolation,
    )?;

    println!("Wrote {} and {}", pkg.display(), manifest.display());
    Ok(())
}
