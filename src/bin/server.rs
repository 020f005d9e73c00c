//! Roastery Content Server
//!
//! Serves the storefront content API and commits admin saves to the
//! configured content source.
//!
//! # Configuration
//!
//! Read from the same config file as the CLI (`--config` or
//! `~/.config/roastery/config.yaml`), with environment overrides:
//! - `ROASTERY_PORT`: Port to listen on (default: 8080)
//! - `ROASTERY_SOURCE`: `local`, `remote`, `api` or `memory`
//! - `ROASTERY_GITHUB_TOKEN` / `GITHUB_TOKEN`: token for the remote source
//! - `ROASTERY_ADMIN_TOKEN`: bearer token required for `PUT /api/content`
//! - `ROASTERY_RECOMMEND_API_KEY` / `GEMINI_API_KEY`: recommendations
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint
//! - `GET /api/content`, `PUT /api/content`: content document
//! - `POST /api/recommend`: coffee recommendation

use clap::Parser;
use roastery::config::{Config, SourceKind};
use roastery::recommend::GeminiRecommender;
use roastery::repository::{build_repository, ContentRepository};
use roastery::server::{router, AppState};
use roastery_core::ContentDocument;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "roastery-server")]
#[command(version)]
#[command(about = "Content API for the roastery storefront", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Content source (overrides config)
    #[arg(long)]
    source: Option<SourceKind>,

    /// Port to listen on (overrides config)
    #[arg(long, short)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roastery=info,roastery_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config)?;
    if let Some(source) = args.source {
        config = config.with_source(source);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(path) = &config.config_file {
        tracing::info!("Config file: {}", path.display());
    }

    let repository = build_repository(&config.content_source())?;
    tracing::info!("Content source: {}", repository.describe());
    if config.source.value == SourceKind::Remote && !config.github.is_configured() {
        tracing::warn!("GitHub owner, repo or token missing - content requests will fail with 503");
    }
    if config.server.admin_token.is_none() {
        tracing::warn!("No admin token set - content saves are not authenticated");
    }

    // Recommendations draw from the catalog the storefront ships with
    let catalog = ContentDocument::bundled();
    let recommender = GeminiRecommender::new(&config.recommend, config.request_timeout())?
        .with_shop_name(catalog.site.site.title.clone());
    if config.recommend.api_key.is_none() {
        tracing::warn!("No recommendation API key - recommendations are disabled");
    }

    let state = AppState::new(repository, Arc::new(recommender), catalog.products)
        .with_admin_token(config.server.admin_token.clone())
        .with_commit_message(&config.github.commit_message);
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
