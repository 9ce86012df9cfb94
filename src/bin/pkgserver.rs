// src/bin/pkgserver.rs
//! Repository tool CLI: initialize a repository and deploy packages

use anyhow::Result;
use clap::{Parser, Subcommand};
use ohpkg::repo::{deploy_package, ensure_repo_dirs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pkgserver")]
#[command(about = "Repository manager for the server-side package directory")]
struct Cli {
    /// Path to the repository root
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the repository directory structure
    Init,

    /// Deploy a .pkg and manifest to a channel and regenerate index.json
    Deploy {
        /// Package archive (.pkg)
        pkg_file: PathBuf,

        /// Manifest file (.json)
        manifest_file: PathBuf,

        /// Channel to deploy to
        #[arg(long, default_value = "stable")]
        channel: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let repo = cli
        .repo
        .ok_or_else(|| anyhow::anyhow!("--repo is required"))?;

    match cli.command {
        Commands::Init => {
            ensure_repo_dirs(&repo)?;
            println!("Repository structure created at {}", repo.display());
        }
        Commands::Deploy {
            pkg_file,
            manifest_file,
            channel,
        } => {
            deploy_package(&repo, &channel, &pkg_file, &manifest_file)?;
            println!(
                "Deployed {} + {} to channel {}",
                pkg_file.display(),
                manifest_file.display(),
                channel
            );
        }
    }
    Ok(())
}
