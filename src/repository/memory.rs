//! In-process git backend.
//!
//! Objects are content-addressed by SHA-256. Trees are flat maps from path
//! to blob id. Used by the `memory` content source and by tests, which can
//! inject failures and simulate other editors committing.

use async_trait::async_trait;
use roastery_core::ContentDocument;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::git::{BlobRef, GitBackend, TreeEntry};
use super::{encode_all, RepositoryError};

/// Backend operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    BranchHead,
    CommitTree,
    ReadFile,
    CreateBlob,
    CreateTree,
    CreateCommit,
    FastForward,
    PutFile,
}

#[derive(Debug, Clone)]
struct CommitObject {
    tree: String,
    parents: Vec<String>,
    #[allow(dead_code)]
    message: String,
}

#[derive(Debug, Default)]
struct State {
    blobs: HashMap<String, Vec<u8>>,
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, CommitObject>,
    refs: HashMap<String, String>,
    /// Calls remaining until the operation fails
    failures: HashMap<Operation, usize>,
    /// Commit landed on the branch just before the operation runs
    races: HashMap<Operation, String>,
    sequence: u64,
}

impl State {
    fn hash(kind: &str, data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update([0]);
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    fn put_blob(&mut self, content: &[u8]) -> String {
        let sha = Self::hash("blob", content);
        self.blobs.insert(sha.clone(), content.to_vec());
        sha
    }

    fn put_tree(&mut self, entries: BTreeMap<String, String>) -> String {
        let listing: String = entries
            .iter()
            .map(|(path, sha)| format!("{} {}\n", path, sha))
            .collect();
        let sha = Self::hash("tree", listing.as_bytes());
        self.trees.insert(sha.clone(), entries);
        sha
    }

    fn put_commit(&mut self, message: &str, tree: &str, parents: &[String]) -> String {
        self.sequence += 1;
        let header = format!(
            "tree {}\nparents {}\nseq {}\n\n{}",
            tree,
            parents.join(" "),
            self.sequence,
            message
        );
        let sha = Self::hash("commit", header.as_bytes());
        self.commits.insert(
            sha.clone(),
            CommitObject {
                tree: tree.to_string(),
                parents: parents.to_vec(),
                message: message.to_string(),
            },
        );
        sha
    }

    fn head(&self, branch: &str) -> Result<String, RepositoryError> {
        self.refs
            .get(branch)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("branch '{}'", branch)))
    }

    fn commit(&self, sha: &str) -> Result<&CommitObject, RepositoryError> {
        self.commits
            .get(sha)
            .ok_or_else(|| RepositoryError::NotFound(format!("commit {}", sha)))
    }

    fn tree(&self, sha: &str) -> Result<&BTreeMap<String, String>, RepositoryError> {
        self.trees
            .get(sha)
            .ok_or_else(|| RepositoryError::NotFound(format!("tree {}", sha)))
    }

    fn blob_at(&self, commit: &str, path: &str) -> Result<BlobRef, RepositoryError> {
        let tree = self.tree(&self.commit(commit)?.tree)?;
        let sha = tree
            .get(path)
            .ok_or_else(|| RepositoryError::NotFound(format!("{} at {}", path, commit)))?;
        let content = self
            .blobs
            .get(sha)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("blob {}", sha)))?;
        Ok(BlobRef {
            sha: sha.clone(),
            content,
        })
    }

    /// Commits `files` on top of the branch head, creating the branch if needed.
    fn commit_on_branch(&mut self, branch: &str, files: &[(&str, &str)], message: &str) -> String {
        let parent = self.refs.get(branch).cloned();
        let mut entries = parent
            .as_ref()
            .and_then(|p| self.commits.get(p))
            .and_then(|c| self.trees.get(&c.tree))
            .cloned()
            .unwrap_or_default();
        for (path, content) in files {
            let sha = self.put_blob(content.as_bytes());
            entries.insert(path.to_string(), sha);
        }
        let tree = self.put_tree(entries);
        let parents: Vec<String> = parent.into_iter().collect();
        let commit = self.put_commit(message, &tree, &parents);
        self.refs.insert(branch.to_string(), commit.clone());
        commit
    }

    /// Applies injected failures and races for `op`.
    fn enter(&mut self, op: Operation, branch: Option<&str>) -> Result<(), RepositoryError> {
        if let Some(remaining) = self.failures.get_mut(&op) {
            *remaining -= 1;
            if *remaining == 0 {
                self.failures.remove(&op);
                return Err(RepositoryError::Transport(format!(
                    "injected failure in {:?}",
                    op
                )));
            }
        }
        if let Some(branch) = branch {
            if let Some(message) = self.races.remove(&op) {
                self.commit_on_branch(branch, &[], &message);
            }
        }
        Ok(())
    }
}

/// A git backend held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `branch` holds the three files of `document`.
    pub fn seeded(branch: &str, document: &ContentDocument) -> Result<Self, RepositoryError> {
        let backend = Self::new();
        let files = encode_all(document)?;
        let files: Vec<(&str, &str)> = files
            .iter()
            .map(|(file, text)| (file.path(), text.as_str()))
            .collect();
        backend.commit_files(branch, &files, "Initial content")?;
        Ok(backend)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Lands a commit on `branch` outside the repository, as another editor would.
    pub fn commit_files(
        &self,
        branch: &str,
        files: &[(&str, &str)],
        message: &str,
    ) -> Result<String, RepositoryError> {
        Ok(self.lock().commit_on_branch(branch, files, message))
    }

    /// Makes the next call of `op` fail with a transport error.
    pub fn fail_next(&self, op: Operation) {
        self.fail_on(op, 1);
    }

    /// Makes the `nth` call of `op` from now fail (1 is the next call).
    pub fn fail_on(&self, op: Operation, nth: usize) {
        self.lock().failures.insert(op, nth.max(1));
    }

    /// Lands an empty commit on the branch just before the next `op` that
    /// names a branch runs.
    pub fn move_branch_before(&self, op: Operation, message: &str) {
        self.lock().races.insert(op, message.to_string());
    }

    pub fn head(&self, branch: &str) -> Option<String> {
        self.lock().refs.get(branch).cloned()
    }

    pub fn parents(&self, commit: &str) -> Vec<String> {
        self.lock()
            .commits
            .get(commit)
            .map(|c| c.parents.clone())
            .unwrap_or_default()
    }

    pub fn commit_count(&self) -> usize {
        self.lock().commits.len()
    }

    /// Text of `path` at the branch head.
    pub fn file_at_head(&self, branch: &str, path: &str) -> Option<String> {
        let state = self.lock();
        let head = state.refs.get(branch)?;
        let blob = state.blob_at(head, path).ok()?;
        String::from_utf8(blob.content).ok()
    }
}

#[async_trait]
impl GitBackend for MemoryBackend {
    async fn branch_head(&self, branch: &str) -> Result<String, RepositoryError> {
        let mut state = self.lock();
        state.enter(Operation::BranchHead, Some(branch))?;
        state.head(branch)
    }

    async fn commit_tree(&self, commit: &str) -> Result<String, RepositoryError> {
        let mut state = self.lock();
        state.enter(Operation::CommitTree, None)?;
        Ok(state.commit(commit)?.tree.clone())
    }

    async fn read_file(&self, commit: &str, path: &str) -> Result<BlobRef, RepositoryError> {
        let mut state = self.lock();
        state.enter(Operation::ReadFile, None)?;
        state.blob_at(commit, path)
    }

    async fn create_blob(&self, content: &str) -> Result<String, RepositoryError> {
        let mut state = self.lock();
        state.enter(Operation::CreateBlob, None)?;
        Ok(state.put_blob(content.as_bytes()))
    }

    async fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, RepositoryError> {
        let mut state = self.lock();
        state.enter(Operation::CreateTree, None)?;
        let mut tree = state.tree(base_tree)?.clone();
        for entry in entries {
            if !state.blobs.contains_key(&entry.sha) {
                return Err(RepositoryError::NotFound(format!("blob {}", entry.sha)));
            }
            tree.insert(entry.path.clone(), entry.sha.clone());
        }
        Ok(state.put_tree(tree))
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, RepositoryError> {
        let mut state = self.lock();
        state.enter(Operation::CreateCommit, None)?;
        state.tree(tree)?;
        for parent in parents {
            state.commit(parent)?;
        }
        Ok(state.put_commit(message, tree, parents))
    }

    async fn fast_forward(&self, branch: &str, commit: &str) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        state.enter(Operation::FastForward, Some(branch))?;
        let head = state.head(branch)?;
        let parent = state.commit(commit)?.parents.first().cloned();
        if parent.as_deref() != Some(head.as_str()) {
            return Err(RepositoryError::Conflict(format!(
                "update of '{}' to {} is not a fast forward",
                branch, commit
            )));
        }
        state.refs.insert(branch.to_string(), commit.to_string());
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
        let mut state = self.lock();
        state.enter(Operation::PutFile, Some(branch))?;
        let head = state.head(branch)?;
        let current = state.blob_at(&head, path)?;
        if current.sha != expected_blob {
            return Err(RepositoryError::Conflict(format!(
                "{} changed on '{}' since it was read",
                path, branch
            )));
        }
        Ok(state.commit_on_branch(branch, &[(path, content)], message))
    }

    fn describe(&self) -> String {
        "in-memory repository".to_string()
    }
}
