//! Durable storage for the content document.
//!
//! A [`ContentRepository`] loads the three content files as one
//! [`Snapshot`] and saves a document back. Implementations:
//!
//! - [`GitRepository`]: commits to a branch through a [`GitBackend`]
//!   ([`GitHubBackend`] for GitHub, [`MemoryBackend`] in process)
//! - [`LocalRepository`]: a directory on disk
//! - [`ApiRepository`]: a running content API server

mod api;
mod error;
mod git;
mod github;
mod local;
mod memory;

pub use api::ApiRepository;
pub use error::{ErrorKind, RepositoryError};
pub use git::{BlobRef, GitBackend, GitRepository, TreeEntry};
pub use github::GitHubBackend;
pub use local::LocalRepository;
pub use memory::{MemoryBackend, Operation};

use async_trait::async_trait;
use roastery_core::{ContentDocument, ContentFile};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GitHubConfig;

/// Opaque marker for the exact state a document was loaded from.
///
/// A commit id for git-backed repositories, a content digest for local
/// directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First seven characters, for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document together with the revision it was read at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub document: ContentDocument,
    pub revision: Revision,
}

/// How a git-backed repository writes the three files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStrategy {
    /// One commit built from blobs and a tree, published by a single
    /// fast-forward of the branch.
    #[default]
    AtomicTree,
    /// One contents-API write per file. Not atomic: a failure part way
    /// leaves earlier files committed.
    PerFile,
}

impl fmt::Display for SaveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStrategy::AtomicTree => write!(f, "atomic_tree"),
            SaveStrategy::PerFile => write!(f, "per_file"),
        }
    }
}

/// Outcome of a successful save.
#[derive(Debug, Clone, Serialize)]
pub struct CommitResult {
    /// Revision now at the head
    pub revision: Revision,
    /// Revision the save was built on
    pub previous: Option<Revision>,
    /// Paths written
    pub files: Vec<String>,
    pub message: String,
    pub strategy: SaveStrategy,
}

/// Loads and saves the content document.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Reads all three files at one revision.
    async fn load(&self) -> Result<Snapshot, RepositoryError>;

    /// Writes the document. With `base`, fails with
    /// [`RepositoryError::Conflict`] if the stored revision is no longer
    /// `base`; without it, saves on top of whatever is current.
    async fn save(
        &self,
        document: &ContentDocument,
        message: &str,
        base: Option<&Revision>,
    ) -> Result<CommitResult, RepositoryError>;

    /// Human-readable location, for logs and `content show`.
    fn describe(&self) -> String;
}

/// Where content lives, chosen once at startup.
#[derive(Debug, Clone)]
pub enum ContentSource {
    Local(PathBuf),
    GitHub {
        config: GitHubConfig,
        timeout: Duration,
    },
    Api {
        url: String,
        token: Option<String>,
        timeout: Duration,
    },
    /// In-process branch seeded with the bundled content
    Memory,
}

/// Builds the repository for a content source.
pub fn build_repository(
    source: &ContentSource,
) -> Result<Arc<dyn ContentRepository>, RepositoryError> {
    let repository: Arc<dyn ContentRepository> = match source {
        ContentSource::Local(dir) => Arc::new(LocalRepository::new(dir.clone())),
        ContentSource::GitHub { config, timeout } => {
            let backend = GitHubBackend::new(config, *timeout)?;
            Arc::new(GitRepository::new(
                backend,
                config.branch.clone(),
                config.strategy,
            ))
        }
        ContentSource::Api {
            url,
            token,
            timeout,
        } => Arc::new(ApiRepository::new(url.clone(), token.clone(), *timeout)?),
        ContentSource::Memory => {
            let backend = MemoryBackend::seeded("main", &ContentDocument::bundled())?;
            Arc::new(GitRepository::new(backend, "main", SaveStrategy::AtomicTree))
        }
    };
    tracing::debug!("Content repository: {}", repository.describe());
    Ok(repository)
}

/// Rejects documents that must never be written.
pub(crate) fn ensure_valid(document: &ContentDocument) -> Result<(), RepositoryError> {
    document
        .validate()
        .map_err(|e| RepositoryError::Invalid(e.to_string()))
}

/// Encodes every file, mapping encode failures to `Invalid`.
pub(crate) fn encode_all(
    document: &ContentDocument,
) -> Result<Vec<(ContentFile, String)>, RepositoryError> {
    document
        .encode_files()
        .map_err(|e| RepositoryError::Invalid(e.to_string()))
}

pub(crate) fn file_paths(files: &[ContentFile]) -> Vec<String> {
    files.iter().map(|f| f.path().to_string()).collect()
}
