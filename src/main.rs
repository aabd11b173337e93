//! Capacity-aware reverse-proxy load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  LOAD BALANCER                   │
//!                     │                                                  │
//!   Client Request    │  ┌─────────┐   ┌────────────┐   ┌─────────────┐  │
//!   ──────────────────┼─▶│  http   │──▶│ resilience │──▶│load_balancer│  │
//!                     │  │ server  │   │ dispatcher │   │    pool     │  │
//!                     │  └─────────┘   └─────┬──────┘   └──────▲──────┘  │
//!                     │                      │                 │         │
//!                     │                      ▼                 │ alive   │
//!   Client Response   │               ┌────────────┐    ┌──────┴──────┐  │
//!   ◀─────────────────┼───────────────│http forward│    │   health    │  │
//!                     │               └─────┬──────┘    │   monitor   │  │
//!                     │                     │           └──────┬──────┘  │
//!                     └─────────────────────┼──────────────────┼─────────┘
//!                                           ▼                  ▼
//!                                       Backends ◀──── TCP probes
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use loadbalancer::config::loader::{parse_backend_list, read_config, ConfigError};
use loadbalancer::config::validation::validate_config;
use loadbalancer::lifecycle::signals::wait_for_signal;
use loadbalancer::observability::{logging, metrics};
use loadbalancer::{BackendPool, HttpServer, ProxyConfig, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "loadbalancer")]
#[command(about = "Capacity-aware reverse-proxy load balancer", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backends as `host:port[=capacity]`, comma separated. Replaces the
    /// backends from the config file.
    #[arg(short, long)]
    backends: Option<String>,

    /// Listen address, overriding the config file.
    #[arg(long)]
    bind: Option<String>,
}

fn load(cli: &Cli) -> Result<ProxyConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(list) = &cli.backends {
        config.backends = parse_backend_list(list)?;
    }
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    logging::init_logging(&config.observability);
    tracing::info!("loadbalancer v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        retry_limit = config.retries.retry_limit,
        attempts_limit = config.retries.attempts_limit,
        health_interval_secs = config.health_check.interval_secs,
        "Configuration loaded"
    );

    let pool = Arc::new(BackendPool::from_config(&config.backends)?);

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    HttpServer::new(config, pool).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
