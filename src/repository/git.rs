//! Content stored on a git branch.
//!
//! [`GitRepository`] drives the commit protocol; a [`GitBackend`] supplies
//! the object and ref operations of a particular host.
//!
//! Atomic save:
//! ```text
//! head  = branch_head(branch)            conflict if head != base
//! tree  = commit_tree(head)
//! blobs = create_blob(file) ...          concurrent
//! new   = create_tree(tree, blobs)
//! c     = create_commit(msg, new, [head])
//! fast_forward(branch, c)                rejected if branch moved
//! ```
//! Nothing is visible on the branch until the final fast-forward.

use async_trait::async_trait;
use futures::future::try_join_all;
use roastery_core::{ContentDocument, ContentFile};
use serde::Serialize;

use super::{
    encode_all, ensure_valid, file_paths, CommitResult, ContentRepository, RepositoryError,
    Revision, SaveStrategy, Snapshot,
};

/// A file's bytes at a commit, with the id of its blob.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobRef {
    pub sha: String,
    pub content: Vec<u8>,
}

/// A path to blob mapping added on top of a base tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub sha: String,
}

/// Object and ref operations on a hosted git repository.
#[async_trait]
pub trait GitBackend: Send + Sync {
    /// Commit id the branch points at.
    async fn branch_head(&self, branch: &str) -> Result<String, RepositoryError>;

    /// Root tree id of a commit.
    async fn commit_tree(&self, commit: &str) -> Result<String, RepositoryError>;

    async fn read_file(&self, commit: &str, path: &str) -> Result<BlobRef, RepositoryError>;

    /// Stores `content` and returns its blob id.
    async fn create_blob(&self, content: &str) -> Result<String, RepositoryError>;

    /// Builds a tree from `base_tree` with `entries` replaced or added.
    async fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, RepositoryError>;

    async fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, RepositoryError>;

    /// Moves the branch to `commit` without forcing. Fails with
    /// [`RepositoryError::Conflict`] if that would not be a fast-forward.
    async fn fast_forward(&self, branch: &str, commit: &str) -> Result<(), RepositoryError>;

    /// Commits a single file directly on the branch, provided its current
    /// blob is still `expected_blob`. Returns the new commit id.
    async fn put_file(
        &self,
        branch: &str,
        path: &str,
        content: &str,
        expected_blob: &str,
        message: &str,
    ) -> Result<String, RepositoryError>;

    fn describe(&self) -> String;
}

/// A [`ContentRepository`] on one branch of a git backend.
pub struct GitRepository<B> {
    backend: B,
    branch: String,
    strategy: SaveStrategy,
}

impl<B: GitBackend> GitRepository<B> {
    pub fn new(backend: B, branch: impl Into<String>, strategy: SaveStrategy) -> Self {
        Self {
            backend,
            branch: branch.into(),
            strategy,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    async fn read_text(&self, commit: &str, file: ContentFile) -> Result<String, RepositoryError> {
        let blob = self.backend.read_file(commit, file.path()).await?;
        String::from_utf8(blob.content).map_err(|e| RepositoryError::Fetch {
            path: file.path().to_string(),
            reason: format!("not UTF-8: {}", e),
        })
    }

    async fn save_atomic(
        &self,
        head: &str,
        files: &[(ContentFile, String)],
        message: &str,
    ) -> Result<String, RepositoryError> {
        let base_tree = self.backend.commit_tree(head).await?;
        tracing::debug!("Base tree {} at {}", base_tree, head);

        let blobs = try_join_all(files.iter().map(|(_, text)| self.backend.create_blob(text)))
            .await?;
        let entries: Vec<TreeEntry> = files
            .iter()
            .zip(blobs)
            .map(|((file, _), sha)| TreeEntry {
                path: file.path().to_string(),
                sha,
            })
            .collect();

        let tree = self.backend.create_tree(&base_tree, &entries).await?;
        tracing::debug!("Created tree {}", tree);

        let commit = self
            .backend
            .create_commit(message, &tree, &[head.to_string()])
            .await?;
        tracing::debug!("Created commit {}", commit);

        self.backend.fast_forward(&self.branch, &commit).await?;
        Ok(commit)
    }

    async fn save_per_file(
        &self,
        head: &str,
        files: &[(ContentFile, String)],
        message: &str,
    ) -> Result<String, RepositoryError> {
        // Blob ids are all taken at the base commit before anything is written
        let current = try_join_all(
            files
                .iter()
                .map(|(file, _)| self.backend.read_file(head, file.path())),
        )
        .await?;

        let mut written = Vec::new();
        let mut latest = head.to_string();
        for ((file, text), blob) in files.iter().zip(current) {
            match self
                .backend
                .put_file(&self.branch, file.path(), text, &blob.sha, message)
                .await
            {
                Ok(commit) => {
                    tracing::debug!("Wrote {} in {}", file, commit);
                    written.push(*file);
                    latest = commit;
                }
                Err(e) if written.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!("Per-file save stopped after {} file(s): {}", written.len(), e);
                    return Err(RepositoryError::PartialWrite {
                        written,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(latest)
    }
}

#[async_trait]
impl<B: GitBackend> ContentRepository for GitRepository<B> {
    async fn load(&self) -> Result<Snapshot, RepositoryError> {
        let head = self.backend.branch_head(&self.branch).await?;

        let (site, navigation, products) = futures::try_join!(
            self.read_text(&head, ContentFile::Site),
            self.read_text(&head, ContentFile::Navigation),
            self.read_text(&head, ContentFile::Products),
        )?;
        let document = ContentDocument::from_files(&site, &navigation, &products)?;

        tracing::info!("Loaded content from {} at {}", self.describe(), head);
        Ok(Snapshot {
            document,
            revision: Revision::new(head),
        })
    }

    async fn save(
        &self,
        document: &ContentDocument,
        message: &str,
        base: Option<&Revision>,
    ) -> Result<CommitResult, RepositoryError> {
        ensure_valid(document)?;
        let files = encode_all(document)?;

        let head = self.backend.branch_head(&self.branch).await?;
        if let Some(base) = base {
            if base.as_str() != head {
                return Err(RepositoryError::Conflict(format!(
                    "branch '{}' moved from {} to {} since the content was loaded",
                    self.branch,
                    base.short(),
                    Revision::new(head.as_str()).short()
                )));
            }
        }

        let commit = match self.strategy {
            SaveStrategy::AtomicTree => self.save_atomic(&head, &files, message).await?,
            SaveStrategy::PerFile => self.save_per_file(&head, &files, message).await?,
        };

        tracing::info!(
            "Committed {} file(s) to {} as {}",
            files.len(),
            self.describe(),
            commit
        );
        let written: Vec<ContentFile> = files.iter().map(|(file, _)| *file).collect();
        Ok(CommitResult {
            revision: Revision::new(commit),
            previous: Some(Revision::new(head)),
            files: file_paths(&written),
            message: message.to_string(),
            strategy: self.strategy,
        })
    }

    fn describe(&self) -> String {
        format!("{} (branch {})", self.backend.describe(), self.branch)
    }
}
