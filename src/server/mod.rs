//! HTTP content API.
//!
//! # Endpoints
//!
//! - `GET /health`: health check
//! - `GET /api/content`: current document, `ETag` = revision
//! - `PUT /api/content`: save the full document as one commit; `If-Match`
//!   rejects the save if the content moved
//! - `POST /api/recommend`: coffee suggestion for a free-text preference
//!
//! Errors are plain text.

mod auth;
mod content;
mod error;
mod recommend;

pub use error::ApiError;

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use roastery_core::Product;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::recommend::Recommender;
use crate::repository::ContentRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    repository: Arc<dyn ContentRepository>,
    recommender: Arc<dyn Recommender>,
    /// Catalog snapshot recommendations are drawn from
    catalog: Arc<Vec<Product>>,
    admin_token: Option<Arc<str>>,
    commit_message: Arc<str>,
    /// Held for the duration of a save
    save_gate: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        recommender: Arc<dyn Recommender>,
        catalog: Vec<Product>,
    ) -> Self {
        Self {
            repository,
            recommender,
            catalog: Arc::new(catalog),
            admin_token: None,
            commit_message: Arc::from("chore(content): update site, navigation, products from admin"),
            save_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Requires `Authorization: Bearer <token>` on writes.
    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token.filter(|t| !t.is_empty()).map(Arc::from);
        self
    }

    /// Message used when a save does not supply `X-Commit-Message`.
    pub fn with_commit_message(mut self, message: impl AsRef<str>) -> Self {
        self.commit_message = Arc::from(message.as_ref());
        self
    }

    /// Gate held while a save runs.
    pub fn save_gate(&self) -> Arc<Mutex<()>> {
        self.save_gate.clone()
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let content_routes = Router::new()
        .route(
            "/api/content",
            get(content::get_content)
                .put(content::put_content)
                .fallback(content::method_not_allowed),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin_for_writes,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/api/recommend", post(recommend::recommend))
        .merge(content_routes)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
