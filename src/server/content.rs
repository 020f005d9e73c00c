use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use roastery_core::ContentDocument;
use serde::Serialize;

use super::{ApiError, AppState};
use crate::repository::{Revision, SaveStrategy};

/// Header carrying an optional commit message for `PUT`.
pub const COMMIT_MESSAGE_HEADER: &str = "x-commit-message";

#[derive(Serialize)]
struct SaveResponse {
    ok: bool,
    revision: Revision,
    previous: Option<Revision>,
    files: Vec<String>,
    strategy: SaveStrategy,
}

fn etag(revision: &Revision) -> String {
    format!("\"{}\"", revision)
}

/// Revision from an `If-Match` header. `*` and an absent header mean any.
fn if_match(headers: &HeaderMap) -> Option<Revision> {
    let value = headers.get(header::IF_MATCH)?.to_str().ok()?.trim();
    if value.is_empty() || value == "*" {
        return None;
    }
    Some(Revision::new(
        value.trim_start_matches("W/").trim_matches('"'),
    ))
}

pub(super) async fn get_content(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.repository.load().await?;
    Ok((
        [(header::ETAG, etag(&snapshot.revision))],
        Json(snapshot.document),
    )
        .into_response())
}

pub(super) async fn put_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ContentDocument>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(document) = body?;
    let base = if_match(&headers);
    let message = headers
        .get(COMMIT_MESSAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(state.commit_message.as_ref())
        .to_string();

    let _guard = state
        .save_gate
        .try_lock()
        .map_err(|_| ApiError::SaveInProgress)?;

    let result = state
        .repository
        .save(&document, &message, base.as_ref())
        .await?;
    tracing::info!("Saved content as {}", result.revision);

    Ok((
        [(header::ETAG, etag(&result.revision))],
        Json(SaveResponse {
            ok: true,
            revision: result.revision,
            previous: result.previous,
            files: result.files,
            strategy: result.strategy,
        }),
    )
        .into_response())
}

pub(super) async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, PUT")],
        "Method Not Allowed",
    )
        .into_response()
}
