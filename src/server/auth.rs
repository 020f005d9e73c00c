use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AppState;

/// Authentication middleware for content writes.
///
/// Reads pass through. When an admin token is configured, a `PUT` must
/// carry it as a bearer token.
pub(super) async fn require_admin_for_writes(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_token.as_deref() else {
        return next.run(request).await;
    };
    if request.method() != Method::PUT {
        return next.run(request).await;
    }

    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let rejection = match auth_header {
        Some(h) if h.strip_prefix("Bearer ") == Some(expected) => None,
        Some(h) if !h.starts_with("Bearer ") => {
            Some("Authorization header must use Bearer scheme")
        }
        Some(_) => Some("Invalid admin token"),
        None => Some("Authorization header required"),
    };

    match rejection {
        None => next.run(request).await,
        Some(message) => (StatusCode::UNAUTHORIZED, message).into_response(),
    }
}
