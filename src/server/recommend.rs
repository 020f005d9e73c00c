use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::AppState;

#[derive(Deserialize)]
pub(super) struct RecommendRequest {
    preference: String,
}

#[derive(Serialize)]
pub(super) struct RecommendResponse {
    text: String,
}

/// Coffee suggestion for a free-text preference. Upstream failures come
/// back as fallback text, never as an error status.
pub(super) async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Json<RecommendResponse> {
    let text = state
        .recommender
        .recommend(request.preference.trim(), &state.catalog)
        .await;
    Json(RecommendResponse { text })
}
