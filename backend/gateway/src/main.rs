//! BountyBoard gateway: entry point.
//!
//! Reads task boxes from an algod node and exposes a small Axum REST API for
//! the frontend: task listings, the actions a caller may take, and unsigned
//! transactions ready for wallet signing.

mod algod;
mod api;
mod config;
mod errors;

use std::sync::Arc;

use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use algod::AlgodClient;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    info!(
        "BountyBoard app {} ({}) on {}",
        config.contract.app_id, config.contract.app_address, config.contract.network
    );

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    let algod = Arc::new(AlgodClient::new(
        client,
        &config.algod_url,
        config.algod_token.clone(),
    ));
    info!("Reading from algod at {}", config.algod_url);

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState::new(
        config.contract.clone(),
        algod.clone(),
        algod,
        config.listing_concurrency,
    ));

    let app = api::router(api_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
