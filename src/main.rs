//! Request gatekeeper (v1)
//!
//! A rate-limiting, credential-checking front for a rendered site.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id → trace → limits → gatekeeper ─┬─▶ /api/auth (local)
//!                                                  │            │
//!                                   429 / 401 / 303 ◀┘           └─▶ upstream site
//!
//!     Cross-cutting: config (TOML + env), observability (tracing, Prometheus),
//!                    lifecycle (signals, graceful shutdown, window sweeper)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use gatekeeper::config::{load_secrets, resolve_config, ConfigOverrides};
use gatekeeper::lifecycle::{shutdown_signal, Shutdown};
use gatekeeper::observability::{logging, metrics};
use gatekeeper::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "gatekeeper", version, about = "Rate limiting and admin access gatekeeper")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long, env = "GATEKEEPER_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let overrides = ConfigOverrides {
        bind_address: args.bind,
    };
    let config = resolve_config(args.config.as_deref(), overrides)?;

    logging::init_logging(&config.observability);
    tracing::info!("gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));

    let secrets = load_secrets()?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        environment = ?config.environment,
        rate_limit = config.rate_limit.max_requests,
        rate_window_secs = config.rate_limit.window_secs,
        login_attempts = config.login_throttle.max_attempts,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, &secrets)?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
