//! x402 payment gateway.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p a402-gate --release
//!
//! # Run with custom config path
//! cargo run -p a402-gate -- --config /path/to/gate.toml
//!
//! # Configure logging level
//! RUST_LOG=debug cargo run -p a402-gate
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `config.toml`)
//! - `HOST` - Override bind address (default: `0.0.0.0`)
//! - `PORT` - Override port (default: `4402`)
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::net::SocketAddr;

use a402_gate::config::GateConfig;
use a402_gate::discovery::register_routes;
use a402_gate::routes::{facilitator_client, router};
use a402_gate::util::SigDown;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("Gateway failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = GateConfig::load()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        routes = config.routes.len(),
        "Loaded configuration"
    );

    if config.routes.is_empty() {
        tracing::warn!("No routes configured, only /health will be served");
    }

    let app = router(&config)?;

    if config.discovery.register {
        match facilitator_client(&config)? {
            Some(facilitator) => {
                let registered = register_routes(&config, &facilitator).await;
                tracing::info!(
                    registered,
                    total = config.routes.len(),
                    "Discovery registration done"
                );
            }
            None => tracing::warn!("Discovery registration needs facilitator_url, skipping"),
        }
    }

    let sig_down = SigDown::try_new()?;
    let token = sig_down.cancellation_token();

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Gateway listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;
    sig_down.recv().await;

    tracing::info!("Gateway shut down gracefully");
    Ok(())
}
