//! xingd - Level-Crossing Control Daemon
//!
//! Runs the crossing simulator with its background scheduler and serves the
//! status/command API over HTTP.
//!
//! Usage:
//!   xingd [--config FILE] [--port N] [--seed N] [--log-json]

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use xing_api::{create_router, AppState};
use xing_core::{RailwaySystem, Scheduler};

use crate::config::DaemonConfig;

#[derive(Parser, Debug)]
#[command(name = "xingd")]
#[command(about = "Railway level-crossing control daemon")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, env = "XINGD_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Seed for reproducible component wear
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "xingd=info,xing_core=info,xing_api=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    tracing::info!("Starting xingd (level-crossing control daemon)");

    let mut config = match args.config {
        Some(ref path) => {
            tracing::info!("Loading config from: {}", path.display());
            DaemonConfig::load(path)?
        }
        None => {
            tracing::info!("No config file provided, using defaults");
            DaemonConfig::default()
        }
    };
    config.merge_with_args(args.port, args.seed);

    let system = Arc::new(RailwaySystem::new(config.system.clone()));
    let scheduler = Scheduler::start(system.clone());

    let app = create_router(AppState::new(system));

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                config.server.host, config.server.port
            )
        })?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    tracing::info!("xingd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(?e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
