//! Board Master - HTTP master server
//!
//! Loads configuration, starts the score propagation worker and serves the
//! game API until Ctrl+C.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use board_master::{
    Coordinator, DiscardCollector, GameRegistry, HttpCollector, MasterConfig, Propagator,
    RockPaperScissors, ScoreCollector,
};
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    initialize_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            port,
            host,
            collector_url,
            network_prefix,
            duplicate_policy,
        } => {
            let mut config = load_config(config)?;
            if let Some(port) = port.or_else(env_port) {
                config = config.with_port(port);
            }
            if let Some(host) = host {
                config = config.with_host(host);
            }
            if let Some(url) = collector_url.or_else(|| std::env::var("COLLECTOR_URL").ok()) {
                config = config.with_collector_url(url);
            }
            if let Some(prefix) = network_prefix {
                config = config.with_network_prefix(prefix);
            }
            if let Some(policy) = duplicate_policy {
                config = config.with_duplicate_policy(policy);
            }
            config.validate()?;
            run_server(config).await
        }
    }
}

fn env_port() -> Option<u16> {
    std::env::var("PORT").ok().and_then(|p| p.parse().ok())
}

#[instrument]
fn load_config(path: Option<PathBuf>) -> Result<MasterConfig> {
    match path {
        Some(path) => Ok(MasterConfig::from_file(&path)?),
        None => {
            info!("No config file given, using defaults");
            Ok(MasterConfig::default())
        }
    }
}

/// Run the HTTP master server
#[instrument(skip(config), fields(port = *config.port()))]
async fn run_server(config: MasterConfig) -> Result<()> {
    let collector: Arc<dyn ScoreCollector> = match config.collector_url() {
        Some(url) => Arc::new(HttpCollector::new(url, config.collector_timeout())?),
        None => {
            warn!("No collector URL configured, scores will not be propagated");
            Arc::new(DiscardCollector)
        }
    };

    let (propagator, worker) = Propagator::spawn(collector, *config.queue_capacity());
    let pending = propagator.pending_jobs();
    let registry = GameRegistry::with_policy(*config.duplicate_policy());
    let coordinator = Coordinator::new(registry, Arc::new(RockPaperScissors), propagator);
    let app = board_master::router(coordinator);

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port()))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host(), config.port()))?;

    let advertised =
        board_master::discover_host(config.network_prefix().as_deref(), config.host()).await;
    info!("Master is running at http://{}:{}", advertised, config.port());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(
        pending = pending.count(),
        "Server stopped, draining propagation queue"
    );
    board_master::drain_worker(worker, &pending, config.drain_timeout()).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,board_master=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
