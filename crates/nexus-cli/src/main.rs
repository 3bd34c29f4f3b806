//! Entry point for the `nexus` binary: parses flags, assembles a
//! `NexusConfig`, wires storage and the HTTP app, and serves.

mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use nexus_cache::PackageCache;
use nexus_core::config::StorageBackend;
use nexus_core::NexusConfig;
use nexus_server::AppState;
use nexus_storage::{FilesystemStorage, MemoryStorage, Storage};
use nexus_winget::WinGetIndex;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "nexus", version, about = "Universal package-registry gateway and CDN")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit structured JSON logs instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StorageArg {
    Memory,
    Filesystem,
}

impl From<StorageArg> for StorageBackend {
    fn from(value: StorageArg) -> Self {
        match value {
            StorageArg::Memory => StorageBackend::Memory,
            StorageArg::Filesystem => StorageBackend::Filesystem,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the HTTP gateway (default when no subcommand is given).
    Serve {
        /// Address to bind the HTTP server to.
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,

        /// Which storage backend to use.
        #[arg(long, value_enum, default_value = "memory")]
        storage: StorageArg,

        /// Root directory for `--storage filesystem`.
        #[arg(long)]
        storage_root: Option<String>,

        /// GitHub API token; falls back to the `GITHUB_TOKEN` env var.
        #[arg(long, env = "GITHUB_TOKEN")]
        github_token: Option<String>,
    },
    /// Rebuild the WinGet manifest index from the upstream `winget-pkgs` repo
    /// and exit, without starting the server.
    RebuildWinget {
        #[arg(long, value_enum, default_value = "memory")]
        storage: StorageArg,

        #[arg(long)]
        storage_root: Option<String>,

        #[arg(long, env = "GITHUB_TOKEN")]
        github_token: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Serve {
        bind: "127.0.0.1:8080".to_string(),
        storage: StorageArg::Memory,
        storage_root: None,
        github_token: None,
    });

    logging::init(cli.verbose, cli.json);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    runtime.block_on(run(command, cli.verbose, cli.json))
}

async fn run(command: Commands, verbosity: u8, json_logs: bool) -> Result<()> {
    match command {
        Commands::Serve {
            bind,
            storage,
            storage_root,
            github_token,
        } => serve(bind, storage, storage_root, github_token, verbosity, json_logs).await,
        Commands::RebuildWinget {
            storage,
            storage_root,
            github_token,
        } => rebuild_winget(storage, storage_root, github_token).await,
    }
}

fn build_storage(backend: StorageArg, root: Option<&str>) -> Result<Arc<dyn Storage>> {
    match backend {
        StorageArg::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageArg::Filesystem => {
            let root = root
                .ok_or_else(|| miette::miette!("--storage filesystem requires --storage-root"))?;
            Ok(Arc::new(FilesystemStorage::new(root)))
        }
    }
}

async fn serve(
    bind: String,
    storage: StorageArg,
    storage_root: Option<String>,
    github_token: Option<String>,
    verbosity: u8,
    json_logs: bool,
) -> Result<()> {
    let mut config = NexusConfig::new(bind)
        .with_verbosity(verbosity)
        .with_json_logs(json_logs)
        .with_storage_backend(storage.into());
    if let Some(root) = storage_root.clone() {
        config = config.with_storage_root(root);
    }
    if let Some(token) = github_token {
        config = config.with_github_token(token);
    }
    let config = config.with_env_overrides();

    let backend = build_storage(storage, storage_root.as_deref())?;
    let cache = PackageCache::new(backend.clone());
    let winget = WinGetIndex::with_token(backend, config.github_token.clone());

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, cache, winget);
    let app = nexus_server::build_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.into_diagnostic()?;
    tracing::info!(addr = %bind_addr, "nexus listening");
    axum::serve(listener, app).await.into_diagnostic()?;
    Ok(())
}

async fn rebuild_winget(
    storage: StorageArg,
    storage_root: Option<String>,
    github_token: Option<String>,
) -> Result<()> {
    let backend = build_storage(storage, storage_root.as_deref())?;
    let winget = WinGetIndex::with_token(backend, github_token);
    winget.rebuild().await.into_diagnostic()?;
    tracing::info!("winget index rebuilt");
    Ok(())
}
