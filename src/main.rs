use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use node_provision::config::{self, DEFAULT_CONFIG_FILE};
use node_provision::{InstallRequest, NodeInstaller, NpmMode, Platform};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision a Node.js runtime into the project install directory
    Install {
        /// Node version, e.g. v18.17.1 (overrides the config file)
        version: Option<String>,

        /// npm version; "provided" uses the npm bundled with node
        #[arg(long)]
        npm_version: Option<String>,

        /// Download root override, or the complete archive URL for the
        /// "provided" node version
        #[arg(long)]
        download_root: Option<String>,

        /// Expected SHA-256 hex digest of the download
        #[arg(long)]
        download_hash: Option<String>,

        /// Path to the project config file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Directory the node/ install tree is created under
        #[arg(long)]
        install_directory: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Install {
            version,
            npm_version,
            download_root,
            download_hash,
            config,
            install_directory,
        } => {
            let file = config::load_config(&config)?;
            let credentials = file.credentials();

            let node_version = version
                .or(file.node_version)
                .context("no node version given (pass one or set nodeVersion in the config)")?;
            let npm_version = npm_version.or(file.npm_version);
            let npm_mode = NpmMode::from_version(npm_version.as_deref());

            let mut request = InstallRequest::new(&node_version, npm_mode)?;
            if let Some(root) = download_root.or(file.node_download_root) {
                request = request.with_download_root(root);
            }
            if let Some(hash) = download_hash.or(file.node_download_hash) {
                request = request.with_download_hash(hash);
            }
            if let Some(credentials) = credentials {
                request = request.with_credentials(credentials);
            }

            let install_directory = install_directory
                .or(file.install_directory)
                .unwrap_or_else(|| PathBuf::from("."));

            println!("Installing Node.js {}", node_version.green());
            let installer = NodeInstaller::new(install_directory, Platform::current())?;
            installer.install(&request)?;
            println!("Node.js {} is ready", node_version.green());
        }
    }

    Ok(())
}
