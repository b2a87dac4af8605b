//! Dedupe server.
//!
//! Provides an HTTP API that collapses duplicate places in a ranked
//! result page.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cypress_dedupe::api::{build_router, AppState};
use cypress_dedupe::{DedupeConfig, Deduplicator};

#[derive(Parser, Debug)]
#[command(name = "dedupe-server")]
#[command(about = "Geocoding result deduplication server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// Dedupe tables (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Cypress Dedupe Server");

    let config = load_config(args.config.as_ref())?;
    let deduplicator = Deduplicator::new(&config).context("Invalid dedupe config")?;
    info!(
        "Geo radius {} m, {} curated layers",
        deduplicator.policy().radius_meters(),
        config.layers.curated.len()
    );

    let state = Arc::new(AppState::new(deduplicator));

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<DedupeConfig> {
    match path {
        Some(path) if path.exists() => {
            info!("Loading dedupe config from {:?}", path);
            DedupeConfig::load_from_file(path)
        }
        Some(path) => {
            warn!("Config file {:?} not found, using defaults", path);
            Ok(DedupeConfig::default())
        }
        None => Ok(DedupeConfig::default()),
    }
}
