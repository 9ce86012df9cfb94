// src/bin/pkgmgr.rs
//! Client CLI: configure, list, install, uninstall, patch, cross-compile

use anyhow::Result;
use clap::{Parser, Subcommand};
use ohpkg::arch::map_arch_str;
use ohpkg::client::config::{
    default_arch, default_config_path, is_valid_http_url, Config,
};
use ohpkg::client::Client;
use ohpkg::filesystem::absolute;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pkgmgr")]
#[command(about = "Client for the package repository (config, list, add, del, patch, xcompile)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the client with repo URL, SDK path, default arch
    Config {
        /// Repository root URL (e.g. https://repo.example.com)
        #[arg(short = 's', long = "server-root")]
        server_root: String,

        /// Directory of the local SDK
        #[arg(short = 'd', long = "ohos-sdk")]
        ohos_sdk: PathBuf,

        /// Default architecture (e.g. aarch64, arm, x86_64)
        #[arg(short = 'a', long = "arch")]
        arch: String,

        /// Default channel
        #[arg(short = 'c', long = "channel")]
        channel: Option<String>,

        /// Package source repository, for cross-compiling
        #[arg(long = "pkg-src-repo")]
        pkg_src_repo: Option<PathBuf>,
    },

    /// List packages available for an architecture
    List {
        /// Architecture (defaults to the configured one)
        #[arg(long)]
        arch: Option<String>,
    },

    /// Install one or more packages (names or local .pkg paths)
    Add {
        /// Package names (optionally with constraints) or .pkg paths
        #[arg(required = true)]
        packages: Vec<String>,

        /// Target install prefix; empty installs into the SDK sysroot
        #[arg(long)]
        prefix: Option<PathBuf>,

        /// Install without interactive confirmation
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Uninstall a package from a prefix
    Del {
        /// Package name
        package: String,

        /// Install prefix the package was installed into
        #[arg(long)]
        prefix: PathBuf,
    },

    /// Patch library metadata in an existing prefix for a new prefix
    Patch {
        prefix: PathBuf,
        new_prefix: PathBuf,
    },

    /// Build packages from source in dependency order
    Xcompile {
        /// Target architecture
        #[arg(short = 'a', long)]
        arch: String,

        /// Package names to build
        #[arg(required = true)]
        packages: Vec<String>,
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

    match cli.command {
        Commands::Config {
            server_root,
            ohos_sdk,
            arch,
            channel,
            pkg_src_repo,
        } => cmd_config(server_root, ohos_sdk, arch, channel, pkg_src_repo),

        Commands::List { arch } => {
            let client = Client::new(Config::load(default_config_path())?)?;
            let arch = match arch {
                Some(arch) => arch,
                None => default_arch(&client.config),
            };
            client.list_packages(&map_arch_str(&arch)?)?;
            Ok(())
        }

        Commands::Add {
            packages,
            prefix,
            yes,
        } => {
            let client = Client::new(Config::load(default_config_path())?)?;
            match prefix {
                None => client.install_to_sdk(&packages, yes)?,
                Some(prefix) => {
                    let prefix = absolute(&prefix)?;
                    client.install(&packages, &prefix, yes)?;
                }
            }
            Ok(())
        }

        Commands::Del { package, prefix } => {
            let client = Client::new(Config::load(default_config_path())?)?;
            let prefix = absolute(&prefix)?;
            client.uninstall(&package, &prefix)?;
            Ok(())
        }

        Commands::Patch { prefix, new_prefix } => {
            let client = Client::new(Config::load(default_config_path())?)?;
            let prefix = absolute(&prefix)?;
            if !prefix.is_dir() {
                anyhow::bail!("specified prefix not found: {}", prefix.display());
            }
            client.patch_prefix(&prefix, &new_prefix)?;
            Ok(())
        }

        Commands::Xcompile { arch, packages } => {
            let client = Client::new(Config::load(default_config_path())?)?;
            client.xcompile(&packages, &arch)?;
            Ok(())
        }
    }
}

fn cmd_config(
    server_root: String,
    ohos_sdk: PathBuf,
    arch: String,
    channel: Option<String>,
    pkg_src_repo: Option<PathBuf>,
) -> Result<()> {
    let config_path = default_config_path();
    let mut config = Config::load(&config_path).unwrap_or_default();

    if !is_valid_http_url(&server_root) {
        anyhow::bail!("invalid http URL: '{server_root}'");
    }
    config.root_url = server_root;

    let sdk = absolute(&ohos_sdk)?;
    if !sdk.is_dir() {
        anyhow::bail!("the directory '{}' doesn't exist", sdk.display());
    }
    config.ohos_sdk = sdk;

    // store the canonical label so every later command agrees on it
    config.cur_arch = map_arch_str(&arch)?;

    if let Some(channel) = channel {
        config.channel = channel;
    }
    if let Some(repo) = pkg_src_repo {
        config.pkg_src_repo = Some(absolute(&repo)?);
    }

    config.save(&config_path)?;
    println!("config saved to {}", config_path.display());
    Ok(())
}
