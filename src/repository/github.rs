//! GitHub REST API backend.
//!
//! Uses the Git Data API (`git/refs`, `git/commits`, `git/blobs`,
//! `git/trees`) for atomic saves and the contents API for reads and
//! per-file writes.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::git::{BlobRef, GitBackend, TreeEntry};
use super::RepositoryError;
use crate::config::GitHubConfig;

const USER_AGENT: &str = "roastery-admin";
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

#[derive(Deserialize)]
struct ShaObject {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaObject,
}

#[derive(Deserialize)]
struct CommitResponse {
    tree: ShaObject,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    commit: ShaObject,
}

/// A [`GitBackend`] talking to one GitHub repository.
#[derive(Debug, Clone)]
pub struct GitHubBackend {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GitHubBackend {
    /// Builds the HTTP client. A missing token is reported on first use,
    /// before any request is sent.
    pub fn new(config: &GitHubConfig, timeout: Duration) -> Result<Self, RepositoryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url,
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo),
            suffix
        )
    }

    fn token(&self) -> Result<&str, RepositoryError> {
        if self.owner.is_empty() || self.repo.is_empty() {
            return Err(RepositoryError::NotConfigured(
                "GitHub owner and repo are not configured".to_string(),
            ));
        }
        self.token
            .as_deref()
            .ok_or_else(|| RepositoryError::NotConfigured("GitHub token is not configured".to_string()))
    }

    async fn send(
        &self,
        request: RequestBuilder,
        context: &str,
        unprocessable_is_conflict: bool,
    ) -> Result<Response, RepositoryError> {
        let token = self.token()?;
        let response = request
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, context, &body, unprocessable_is_conflict))
    }

    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, RepositoryError> {
        let response = self.send(request, context, false).await?;
        response
            .json()
            .await
            .map_err(|e| transport_error(context, e))
    }
}

fn transport_error(context: &str, e: reqwest::Error) -> RepositoryError {
    if e.is_timeout() {
        RepositoryError::Transport(format!("{}: request timed out", context))
    } else {
        RepositoryError::Transport(format!("{}: {}", context, e))
    }
}

/// Maps a non-2xx GitHub response to an error class.
fn status_error(
    status: StatusCode,
    context: &str,
    body: &str,
    unprocessable_is_conflict: bool,
) -> RepositoryError {
    let detail = format!("{} ({}): {}", context, status.as_u16(), body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RepositoryError::Auth(detail),
        StatusCode::NOT_FOUND => RepositoryError::NotFound(detail),
        StatusCode::CONFLICT => RepositoryError::Conflict(detail),
        StatusCode::UNPROCESSABLE_ENTITY if unprocessable_is_conflict => {
            RepositoryError::Conflict(detail)
        }
        _ => RepositoryError::Transport(detail),
    }
}

/// Decodes a contents-API body, which is base64 wrapped at 60 columns.
fn decode_contents(path: &str, contents: &ContentsResponse) -> Result<Vec<u8>, RepositoryError> {
    if !contents.encoding.is_empty() && contents.encoding != "base64" {
        return Err(RepositoryError::Fetch {
            path: path.to_string(),
            reason: format!("unsupported encoding '{}'", contents.encoding),
        });
    }
    let compact: String = contents
        .content
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| RepositoryError::Fetch {
            path: path.to_string(),
            reason: e.to_string(),
        })
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl GitBackend for GitHubBackend {
    async fn branch_head(&self, branch: &str) -> Result<String, RepositoryError> {
        let url = self.repo_url(&format!("git/ref/heads/{}", encode_path(branch)));
        let reference: RefResponse = self.json(self.client.get(url), "read branch").await?;
        Ok(reference.object.sha)
    }

    async fn commit_tree(&self, commit: &str) -> Result<String, RepositoryError> {
        let url = self.repo_url(&format!("git/commits/{}", commit));
        let commit: CommitResponse = self.json(self.client.get(url), "read commit").await?;
        Ok(commit.tree.sha)
    }

    async fn read_file(&self, commit: &str, path: &str) -> Result<BlobRef, RepositoryError> {
        let url = self.repo_url(&format!(
            "contents/{}?ref={}",
            encode_path(path),
            urlencoding::encode(commit)
        ));
        let contents: ContentsResponse = self
            .json(self.client.get(url), &format!("read {}", path))
            .await?;
        let content = decode_contents(path, &contents)?;
        Ok(BlobRef {
            sha: contents.sha,
            content,
        })
    }

    async fn create_blob(&self, content: &str) -> Result<String, RepositoryError> {
        let body = json!({ "content": content, "encoding": "utf-8" });
        let blob: ShaObject = self
            .json(
                self.client.post(self.repo_url("git/blobs")).json(&body),
                "create blob",
            )
            .await?;
        Ok(blob.sha)
    }

    async fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, RepositoryError> {
        let tree: Vec<_> = entries
            .iter()
            .map(|e| json!({ "path": e.path, "mode": "100644", "type": "blob", "sha": e.sha }))
            .collect();
        let body = json!({ "base_tree": base_tree, "tree": tree });
        let created: ShaObject = self
            .json(
                self.client.post(self.repo_url("git/trees")).json(&body),
                "create tree",
            )
            .await?;
        Ok(created.sha)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, RepositoryError> {
        let body = json!({ "message": message, "tree": tree, "parents": parents });
        let commit: ShaObject = self
            .json(
                self.client.post(self.repo_url("git/commits")).json(&body),
                "create commit",
            )
            .await?;
        Ok(commit.sha)
    }

    async fn fast_forward(&self, branch: &str, commit: &str) -> Result<(), RepositoryError> {
        let url = self.repo_url(&format!("git/refs/heads/{}", encode_path(branch)));
        let body = json!({ "sha": commit, "force": false });
        // GitHub answers 422 "Update is not a fast forward" when the branch moved
        self.send(self.client.patch(url).json(&body), "update branch", true)
            .await?;
        Ok(())
    }

    async fn put_file(
        &self,
        branch: &str,
        path: &str,
        content: &str,
        expected_blob: &str,
        message: &str,
    ) -> Result<String, RepositoryError> {
        let url = self.repo_url(&format!("contents/{}", encode_path(path)));
        let body = json!({
            "message": message,
            "content": base64::engine::general_purpose::STANDARD.encode(content),
            "sha": expected_blob,
            "branch": branch,
        });
        let response = self
            .send(
                self.client.put(url).json(&body),
                &format!("write {}", path),
                false,
            )
            .await?;
        let written: PutContentsResponse = response
            .json()
            .await
            .map_err(|e| transport_error("write file", e))?;
        Ok(written.commit.sha)
    }

    fn describe(&self) -> String {
        format!("github.com/{}/{}", self.owner, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> GitHubConfig {
        GitHubConfig {
            owner: "roastery".to_string(),
            repo: "storefront".to_string(),
            token: token.map(String::from),
            // Nothing listens here; tests must fail before connecting
            api_url: "http://127.0.0.1:9/".to_string(),
            ..GitHubConfig::default()
        }
    }

    #[test]
    fn test_repo_url() {
        let backend = GitHubBackend::new(&config(Some("t")), Duration::from_secs(1)).unwrap();
        assert_eq!(
            backend.repo_url("git/blobs"),
            "http://127.0.0.1:9/repos/roastery/storefront/git/blobs"
        );
    }

    #[test]
    fn test_encode_path_keeps_slashes() {
        assert_eq!(encode_path("content/site.json"), "content/site.json");
        assert_eq!(encode_path("feature/new menu"), "feature/new%20menu");
    }

    #[test]
    fn test_status_mapping() {
        let map = |code: u16, ff: bool| {
            status_error(StatusCode::from_u16(code).unwrap(), "op", "body", ff).kind()
        };
        use crate::repository::ErrorKind;
        assert_eq!(map(401, false), ErrorKind::Auth);
        assert_eq!(map(403, false), ErrorKind::Auth);
        assert_eq!(map(404, false), ErrorKind::NotFound);
        assert_eq!(map(409, false), ErrorKind::Conflict);
        assert_eq!(map(422, true), ErrorKind::Conflict);
        assert_eq!(map(422, false), ErrorKind::Transport);
        assert_eq!(map(502, false), ErrorKind::Transport);
    }

    #[test]
    fn test_status_error_carries_body() {
        let err = status_error(StatusCode::BAD_GATEWAY, "create blob", "upstream\n", false);
        assert_eq!(err.to_string(), "transport error: create blob (502): upstream");
    }

    #[test]
    fn test_decode_wrapped_base64() {
        let contents = ContentsResponse {
            sha: "abc".to_string(),
            content: "eyJsaW5rcyI6\nIFtdfQ==\n".to_string(),
            encoding: "base64".to_string(),
        };
        let bytes = decode_contents("content/navigation.json", &contents).unwrap();
        assert_eq!(bytes, b"{\"links\": []}");
    }

    #[test]
    fn test_decode_bad_base64_is_fetch_error() {
        let contents = ContentsResponse {
            sha: "abc".to_string(),
            content: "not base64!".to_string(),
            encoding: "base64".to_string(),
        };
        let err = decode_contents("content/site.json", &contents).unwrap_err();
        assert!(matches!(err, RepositoryError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_request() {
        let backend = GitHubBackend::new(&config(None), Duration::from_secs(1)).unwrap();
        let err = backend.branch_head("main").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotConfigured(_)));
        assert_eq!(err.to_string(), "GitHub token is not configured");
    }

    #[tokio::test]
    async fn test_empty_token_counts_as_missing() {
        let backend = GitHubBackend::new(&config(Some("")), Duration::from_secs(1)).unwrap();
        let err = backend.create_blob("x").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport() {
        let backend = GitHubBackend::new(&config(Some("t")), Duration::from_secs(2)).unwrap();
        let err = backend.branch_head("main").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Transport(_)));
    }
}
