//! Client for a running content API (`GET`/`PUT /api/content`).

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use roastery_core::ContentDocument;
use serde::Deserialize;
use std::time::Duration;

use super::{CommitResult, ContentRepository, RepositoryError, Revision, SaveStrategy, Snapshot};

#[derive(Deserialize)]
struct SaveResponse {
    revision: Revision,
    #[serde(default)]
    previous: Option<Revision>,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    strategy: SaveStrategy,
}

/// A [`ContentRepository`] backed by another server's content API.
#[derive(Debug, Clone)]
pub struct ApiRepository {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiRepository {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(RepositoryError::NotConfigured(
                "content API URL is not configured".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn content_url(&self) -> String {
        format!("{}/api/content", self.base_url)
    }
}

/// The server's plain-text error bodies mapped back to error classes.
fn status_error(status: StatusCode, body: String) -> RepositoryError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RepositoryError::Auth(body),
        StatusCode::NOT_FOUND => RepositoryError::NotFound(body),
        StatusCode::CONFLICT => RepositoryError::Conflict(body),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            RepositoryError::Invalid(body)
        }
        StatusCode::SERVICE_UNAVAILABLE => RepositoryError::NotConfigured(body),
        // Another save holds the server's lock; retrying is enough
        StatusCode::LOCKED => RepositoryError::Transport(body),
        _ => RepositoryError::Transport(format!("{}: {}", status, body)),
    }
}

fn transport(e: reqwest::Error) -> RepositoryError {
    if e.is_timeout() {
        RepositoryError::Transport("content API request timed out".to_string())
    } else {
        RepositoryError::Transport(e.to_string())
    }
}

fn parse_etag(value: &str) -> Revision {
    Revision::new(value.trim_start_matches("W/").trim_matches('"'))
}

#[async_trait]
impl ContentRepository for ApiRepository {
    async fn load(&self) -> Result<Snapshot, RepositoryError> {
        let response = self
            .client
            .get(self.content_url())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let revision = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(parse_etag)
            .ok_or_else(|| RepositoryError::Fetch {
                path: self.content_url(),
                reason: "response has no ETag".to_string(),
            })?;
        let document: ContentDocument = response.json().await.map_err(|e| RepositoryError::Fetch {
            path: self.content_url(),
            reason: e.to_string(),
        })?;

        Ok(Snapshot { document, revision })
    }

    async fn save(
        &self,
        document: &ContentDocument,
        message: &str,
        base: Option<&Revision>,
    ) -> Result<CommitResult, RepositoryError> {
        let mut request = self
            .client
            .put(self.content_url())
            .header("X-Commit-Message", message)
            .json(document);
        if let Some(base) = base {
            request = request.header(header::IF_MATCH, format!("\"{}\"", base));
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let saved: SaveResponse = response.json().await.map_err(transport)?;
        Ok(CommitResult {
            revision: saved.revision,
            previous: saved.previous.or_else(|| base.cloned()),
            files: saved.files,
            message: message.to_string(),
            strategy: saved.strategy,
        })
    }

    fn describe(&self) -> String {
        format!("content API at {}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ErrorKind;

    #[test]
    fn test_parse_etag() {
        assert_eq!(parse_etag("\"abc\"").as_str(), "abc");
        assert_eq!(parse_etag("W/\"abc\"").as_str(), "abc");
        assert_eq!(parse_etag("abc").as_str(), "abc");
    }

    #[test]
    fn test_status_error_classes() {
        let kind = |code: u16| status_error(StatusCode::from_u16(code).unwrap(), "x".into()).kind();
        assert_eq!(kind(401), ErrorKind::Auth);
        assert_eq!(kind(409), ErrorKind::Conflict);
        assert_eq!(kind(422), ErrorKind::Invalid);
        assert_eq!(kind(503), ErrorKind::NotConfigured);
        assert_eq!(kind(423), ErrorKind::Transport);
        assert_eq!(kind(500), ErrorKind::Transport);
    }

    #[test]
    fn test_empty_url_not_configured() {
        let err = ApiRepository::new("", None, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
    }

    #[test]
    fn test_content_url_trims_slash() {
        let repo = ApiRepository::new("http://localhost:8080/", None, Duration::from_secs(1))
            .unwrap();
        assert_eq!(repo.content_url(), "http://localhost:8080/api/content");
    }
}
