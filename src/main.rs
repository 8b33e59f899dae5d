//! listing-harvester - continuous classifieds listing harvester
//!
//! Walks the results pages of a listings site, extracts each listing and
//! stores the ones not seen before.

use anyhow::Result;
use clap::{Parser, Subcommand};
use listing_harvester::commands::{HarvestCommand, InspectCommand, StoreCommand};
use listing_harvester::config::{Config, OutputFormat};
use listing_harvester::store::{KeyValueStore, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "listing-harvester",
    version,
    about = "Continuous classifieds listing harvester",
    long_about = "Walks results pages of a classifieds site, extracts listings and keeps the new ones in Redis for a day."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// First results page URL
    #[arg(long, global = true, env = "HARVEST_BASE_URL")]
    base_url: Option<String>,

    /// Redis URL for the listing store
    #[arg(long, global = true, env = "HARVEST_REDIS_URL")]
    redis_url: Option<String>,

    /// Keep listings in process memory instead of Redis
    #[arg(long, global = true)]
    memory: bool,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "HARVEST_PROXY")]
    proxy: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest continuously until interrupted
    #[command(alias = "r")]
    Run {
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,
    },

    /// Run a single cycle and print its statistics
    Once,

    /// Diagnose a results page's structure
    #[command(alias = "i")]
    Inspect {
        /// Page to inspect (defaults to the base URL)
        url: Option<String>,

        /// Read the page from a saved HTML file instead of fetching it
        #[arg(long)]
        html_file: Option<PathBuf>,
    },

    /// Print a stored listing
    Show {
        /// Listing id
        id: String,
    },

    /// Remove a stored listing so it is saved again on the next cycle
    Forget {
        /// Listing id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    if let Some(url) = cli.redis_url {
        config.redis_url = url;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(format) = cli.format {
        config.format = format;
    }

    let output = match cli.command {
        Commands::Run { cycles } => {
            let store = open_store(&config, cli.memory).await?;
            let cancel = shutdown_token();
            HarvestCommand::new(config).run(store, cancel, cycles).await?
        }

        Commands::Once => {
            let store = open_store(&config, cli.memory).await?;
            let cancel = shutdown_token();
            HarvestCommand::new(config).once(store, cancel).await?
        }

        Commands::Inspect { url, html_file } => {
            InspectCommand::new(config).execute(url.as_deref(), html_file.as_deref()).await?
        }

        Commands::Show { id } => {
            let store = open_store(&config, cli.memory).await?;
            StoreCommand::new(config).show(store.as_ref(), &id).await?
        }

        Commands::Forget { id } => {
            let store = open_store(&config, cli.memory).await?;
            StoreCommand::new(config).forget(store.as_ref(), &id).await?
        }
    };

    println!("{}", output);
    Ok(())
}

#[cfg(feature = "redis")]
async fn open_store(config: &Config, memory: bool) -> Result<Arc<dyn KeyValueStore>> {
    use anyhow::Context;

    if memory {
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = listing_harvester::store::RedisStore::connect(&config.redis_url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn open_store(_config: &Config, memory: bool) -> Result<Arc<dyn KeyValueStore>> {
    if !memory {
        info!("Built without Redis support, keeping listings in memory");
    }
    Ok(Arc::new(MemoryStore::new()))
}

/// Token cancelled on Ctrl-C or SIGTERM. The current page finishes first.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, finishing current page...");
        trigger.cancel();
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
