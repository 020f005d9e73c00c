use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::repository::{ErrorKind, RepositoryError};

/// Errors returned by API handlers, rendered as plain text.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{}", .0.body_text())]
    Body(#[from] JsonRejection),

    #[error("save already in progress")]
    SaveInProgress,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Repository(e) => match e.kind() {
                ErrorKind::Auth => StatusCode::UNAUTHORIZED,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Transport => StatusCode::BAD_GATEWAY,
                ErrorKind::Fetch
                | ErrorKind::Decode
                | ErrorKind::PartialWrite
                | ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Body(rejection) => rejection.status(),
            ApiError::SaveInProgress => StatusCode::LOCKED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }
        if matches!(self, ApiError::SaveInProgress) {
            return (status, [(header::RETRY_AFTER, "1")], self.to_string()).into_response();
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = |e: RepositoryError| ApiError::from(e).status();
        assert_eq!(status(RepositoryError::Auth("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(RepositoryError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(RepositoryError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status(RepositoryError::NotConfigured("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status(RepositoryError::Transport("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(RepositoryError::Invalid("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::SaveInProgress.status(), StatusCode::LOCKED);
    }

    #[test]
    fn test_save_in_progress_asks_for_retry() {
        let response = ApiError::SaveInProgress.into_response();
        assert_eq!(response.status(), StatusCode::LOCKED);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }
}
