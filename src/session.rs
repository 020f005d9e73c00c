//! Admin editing session.
//!
//! A [`ContentStore`] holds one loaded document, applies edits to it in
//! memory and hands it to the repository on commit. Nothing is persisted
//! until [`ContentStore::commit`] succeeds.

use roastery_core::path::{self, Path, PathError, ShapeMismatch};
use roastery_core::{Category, ContentDocument, DocumentError, NavLink, Product, RoastLevel};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::repository::{CommitResult, ContentRepository, ErrorKind, RepositoryError, Revision};

/// Save progress shown to the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved(String),
    Failed { kind: ErrorKind, message: String },
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStatus::Idle => write!(f, "No changes saved yet"),
            SaveStatus::Saving => write!(f, "Saving..."),
            SaveStatus::Saved(message) => write!(f, "{}", message),
            SaveStatus::Failed { kind, message } => {
                write!(f, "Save failed ({}): {}; {}", kind, message, kind.hint())
            }
        }
    }
}

/// Why an edit was refused. The held document is unchanged.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("edit changes the content shape: {0}")]
    Shape(#[from] ShapeMismatch),

    #[error("edit would make the content invalid: {0}")]
    Invalid(#[source] DocumentError),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a save is already in progress")]
    SaveInProgress,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Fields of a product being added. The id is assigned on insert.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: u64,
    pub category: Category,
    pub description: String,
    pub origin: String,
    pub notes: Vec<String>,
    pub roast_level: RoastLevel,
    pub image_url: String,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: u64, category: Category) -> Self {
        Self {
            name: name.into(),
            price,
            category,
            description: String::new(),
            origin: String::new(),
            notes: Vec::new(),
            roast_level: RoastLevel::Medium,
            image_url: String::new(),
        }
    }

    fn into_product(self) -> Product {
        Product::new(self.name, self.price, self.category)
            .with_description(self.description)
            .with_origin(self.origin)
            .with_notes(self.notes)
            .with_roast_level(self.roast_level)
            .with_image_url(self.image_url)
    }
}

pub struct ContentStore {
    repository: Arc<dyn ContentRepository>,
    document: ContentDocument,
    /// Document as last loaded or saved
    baseline: ContentDocument,
    revision: Option<Revision>,
    notice: Option<String>,
    status: SaveStatus,
}

impl ContentStore {
    /// Loads the document, falling back to the bundled content if the
    /// repository cannot be read.
    pub async fn open(repository: Arc<dyn ContentRepository>) -> Self {
        let (document, revision, notice) = match repository.load().await {
            Ok(snapshot) => (snapshot.document, Some(snapshot.revision), None),
            Err(e) => {
                tracing::warn!("Failed to load content from {}: {}", repository.describe(), e);
                (
                    ContentDocument::bundled(),
                    None,
                    Some(format!("Using bundled content: {}", e)),
                )
            }
        };

        Self {
            repository,
            baseline: document.clone(),
            document,
            revision,
            notice,
            status: SaveStatus::Idle,
        }
    }

    pub fn document(&self) -> &ContentDocument {
        &self.document
    }

    /// Revision the document was loaded or last saved at. `None` when
    /// running on bundled content.
    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.document != self.baseline
    }

    pub fn repository(&self) -> &dyn ContentRepository {
        self.repository.as_ref()
    }

    /// Value at `path` in the document tree.
    pub fn field(&self, path: &Path) -> Result<Value, PathError> {
        path::get(&self.document.to_tree(), path).cloned()
    }

    /// Replaces the value at `path`. The replacement must have the same
    /// shape as the value it replaces (same kinds, keys and array lengths)
    /// and the edited document must still validate. Array lengths change
    /// only through the add and remove operations.
    pub fn apply_field_change(&mut self, path: &Path, value: Value) -> Result<(), EditError> {
        let tree = self.document.to_tree();
        path::check_shape(path, path::get(&tree, path)?, &value)?;

        let tree = path::set(&tree, path, value)?;
        let edited = ContentDocument::from_tree(tree).map_err(EditError::Invalid)?;
        edited.validate().map_err(EditError::Invalid)?;

        tracing::debug!("Set {}", path);
        self.document = edited;
        Ok(())
    }

    /// Appends a product and returns its new id.
    pub fn add_product(&mut self, product: NewProduct) -> String {
        let product = product.into_product();
        let id = product.id.clone();
        self.document.products.push(product);
        id
    }

    pub fn remove_product(&mut self, id: &str) -> bool {
        let len_before = self.document.products.len();
        self.document.products.retain(|p| p.id != id);
        self.document.products.len() != len_before
    }

    pub fn add_nav_link(&mut self, link: NavLink) {
        self.document.navigation.push(link);
    }

    pub fn remove_nav_link(&mut self, index: usize) -> Option<NavLink> {
        (index < self.document.navigation.len()).then(|| self.document.navigation.remove(index))
    }

    /// Saves the document. On failure the edits stay in memory so the save
    /// can be retried.
    pub async fn commit(&mut self, message: &str) -> Result<CommitResult, SessionError> {
        if self.status == SaveStatus::Saving {
            return Err(SessionError::SaveInProgress);
        }
        self.status = SaveStatus::Saving;

        match self
            .repository
            .save(&self.document, message, self.revision.as_ref())
            .await
        {
            Ok(result) => {
                self.status = SaveStatus::Saved(format!(
                    "Saved {} file(s) as {}",
                    result.files.len(),
                    result.revision.short()
                ));
                self.revision = Some(result.revision.clone());
                self.baseline = self.document.clone();
                self.notice = None;
                Ok(result)
            }
            Err(e) => {
                tracing::warn!("Save to {} failed: {}", self.repository.describe(), e);
                self.status = SaveStatus::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                };
                Err(e.into())
            }
        }
    }

    /// Discards local edits and loads the current content.
    pub async fn reload(&mut self) -> Result<(), RepositoryError> {
        let snapshot = self.repository.load().await?;
        self.baseline = snapshot.document.clone();
        self.document = snapshot.document;
        self.revision = Some(snapshot.revision);
        self.notice = None;
        self.status = SaveStatus::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        GitRepository, MemoryBackend, Operation, SaveStrategy, Snapshot,
    };
    use async_trait::async_trait;
    use serde_json::json;

    fn memory_repo() -> Arc<GitRepository<MemoryBackend>> {
        let backend = MemoryBackend::seeded("main", &ContentDocument::bundled()).unwrap();
        Arc::new(GitRepository::new(backend, "main", SaveStrategy::AtomicTree))
    }

    struct Unreachable;

    #[async_trait]
    impl ContentRepository for Unreachable {
        async fn load(&self) -> Result<Snapshot, RepositoryError> {
            Err(RepositoryError::Transport("connection refused".to_string()))
        }

        async fn save(
            &self,
            _document: &ContentDocument,
            _message: &str,
            _base: Option<&Revision>,
        ) -> Result<CommitResult, RepositoryError> {
            Err(RepositoryError::Auth("bad credentials".to_string()))
        }

        fn describe(&self) -> String {
            "unreachable".to_string()
        }
    }

    #[tokio::test]
    async fn test_open_loads_revision() {
        let repo = memory_repo();
        let store = ContentStore::open(repo.clone()).await;

        assert!(store.notice().is_none());
        assert_eq!(
            store.revision().map(|r| r.as_str().to_string()),
            repo.backend().head("main")
        );
        assert_eq!(store.status(), &SaveStatus::Idle);
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_open_falls_back_to_bundled() {
        let store = ContentStore::open(Arc::new(Unreachable)).await;

        assert_eq!(store.document(), &ContentDocument::bundled());
        assert!(store.revision().is_none());
        let notice = store.notice().unwrap();
        assert!(notice.starts_with("Using bundled content:"));
        assert!(notice.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_field_change_replaces_leaf() {
        let mut store = ContentStore::open(memory_repo()).await;
        let path: Path = "products[0].price".parse().unwrap();
        let before = store.document().clone();

        store.apply_field_change(&path, json!(500000)).unwrap();

        assert_eq!(store.document().products[0].price, 500000);
        assert_eq!(store.document().products[0].id, before.products[0].id);
        assert_eq!(store.document().products[1..], before.products[1..]);
        assert_eq!(store.field(&path).unwrap(), json!(500000));
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn test_bad_path_leaves_document() {
        let mut store = ContentStore::open(memory_repo()).await;
        let before = store.document().clone();

        let path: Path = "products[99].price".parse().unwrap();
        let err = store.apply_field_change(&path, json!(1)).unwrap_err();

        assert!(matches!(err, EditError::Path(_)));
        assert_eq!(store.document(), &before);
    }

    #[tokio::test]
    async fn test_shape_change_rejected() {
        let mut store = ContentStore::open(memory_repo()).await;
        let before = store.document().clone();

        let path: Path = "products.0.price".parse().unwrap();
        let err = store.apply_field_change(&path, json!("cheap")).unwrap_err();

        assert!(matches!(err, EditError::Shape(_)));
        assert_eq!(store.document(), &before);
    }

    #[tokio::test]
    async fn test_field_edit_cannot_resize_arrays() {
        let mut store = ContentStore::open(memory_repo()).await;
        let before = store.document().clone();

        for field in ["products", "navigation"] {
            let err = store
                .apply_field_change(&field.parse().unwrap(), json!([]))
                .unwrap_err();
            assert!(matches!(err, EditError::Shape(_)), "{}", field);
        }

        let err = store
            .apply_field_change(&"products[0].notes".parse().unwrap(), json!([]))
            .unwrap_err();
        assert!(matches!(err, EditError::Shape(_)));
        assert_eq!(store.document(), &before);
    }

    #[tokio::test]
    async fn test_field_edit_cannot_add_keys() {
        let mut store = ContentStore::open(memory_repo()).await;
        let before = store.document().clone();
        let path: Path = "site.hero".parse().unwrap();

        let mut hero = store.field(&path).unwrap();
        hero["title"] = json!("New title");
        let mut extended = hero.clone();
        extended["tagline"] = json!("Small batch");

        let err = store.apply_field_change(&path, extended).unwrap_err();
        assert!(matches!(err, EditError::Shape(_)));
        assert!(err.to_string().contains("tagline"));
        assert_eq!(store.document(), &before);

        store.apply_field_change(&path, hero).unwrap();
        assert_eq!(store.document().site.hero.title, "New title");
    }

    #[tokio::test]
    async fn test_field_edit_cannot_change_section_kind() {
        let mut store = ContentStore::open(memory_repo()).await;
        let before = store.document().clone();

        let err = store
            .apply_field_change(&"site.footer".parse().unwrap(), json!(5))
            .unwrap_err();

        assert!(matches!(err, EditError::Shape(_)));
        assert_eq!(store.document(), &before);
    }

    #[tokio::test]
    async fn test_out_of_range_value_is_invalid() {
        let mut store = ContentStore::open(memory_repo()).await;

        let err = store
            .apply_field_change(&"products[0].price".parse().unwrap(), json!(-1))
            .unwrap_err();

        assert!(matches!(err, EditError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_duplicate_id_edit_rejected() {
        let mut store = ContentStore::open(memory_repo()).await;
        let first_id = store.document().products[0].id.clone();

        let path: Path = "products.1.id".parse().unwrap();
        let err = store.apply_field_change(&path, json!(first_id)).unwrap_err();

        assert!(matches!(err, EditError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_add_and_remove_product() {
        let mut store = ContentStore::open(memory_repo()).await;
        let count = store.document().products.len();

        let id = store.add_product(NewProduct::new("Kenya AA", 520000, Category::Coffee));
        assert_eq!(store.document().products.len(), count + 1);
        assert!(store.document().find_product(&id).is_some());
        assert!(store.document().validate().is_ok());

        assert!(store.remove_product(&id));
        assert!(!store.remove_product(&id));
        assert_eq!(store.document().products.len(), count);
    }

    #[tokio::test]
    async fn test_nav_links() {
        let mut store = ContentStore::open(memory_repo()).await;
        let count = store.document().navigation.len();

        store.add_nav_link(NavLink::new("Wholesale", "#wholesale"));
        assert_eq!(store.document().navigation.len(), count + 1);

        let removed = store.remove_nav_link(count).unwrap();
        assert_eq!(removed.name, "Wholesale");
        assert!(store.remove_nav_link(count).is_none());
    }

    #[tokio::test]
    async fn test_commit_advances_revision() {
        let repo = memory_repo();
        let mut store = ContentStore::open(repo.clone()).await;
        let before = store.revision().cloned();
        store
            .apply_field_change(&"site.site.title".parse().unwrap(), json!("New title"))
            .unwrap();

        let result = store.commit("retitle").await.unwrap();

        assert_eq!(result.previous, before);
        assert_eq!(store.revision(), Some(&result.revision));
        assert!(matches!(store.status(), SaveStatus::Saved(_)));
        assert!(!store.is_dirty());
        assert_eq!(repo.load().await.unwrap().document.site.site.title, "New title");
    }

    #[tokio::test]
    async fn test_commit_conflict_keeps_edits() {
        let repo = memory_repo();
        let mut store = ContentStore::open(repo.clone()).await;
        store
            .apply_field_change(&"products.0.price".parse().unwrap(), json!(1))
            .unwrap();
        let edited = store.document().clone();
        repo.backend()
            .commit_files("main", &[("notes.txt", "x")], "other editor")
            .unwrap();

        let err = store.commit("edit").await.unwrap_err();

        assert!(matches!(err, SessionError::Repository(ref e) if e.kind() == ErrorKind::Conflict));
        assert_eq!(store.document(), &edited);
        match store.status() {
            SaveStatus::Failed { kind, .. } => assert_eq!(*kind, ErrorKind::Conflict),
            other => panic!("unexpected status {:?}", other),
        }
        assert!(store.status().to_string().contains("reload"));
    }

    #[tokio::test]
    async fn test_retry_after_transport_failure() {
        let repo = memory_repo();
        let mut store = ContentStore::open(repo.clone()).await;
        store
            .apply_field_change(&"products.0.price".parse().unwrap(), json!(7))
            .unwrap();
        repo.backend().fail_next(Operation::CreateCommit);

        let err = store.commit("edit").await.unwrap_err();
        assert!(matches!(err, SessionError::Repository(ref e) if e.kind() == ErrorKind::Transport));
        assert!(store.is_dirty());

        store.commit("edit").await.unwrap();
        assert_eq!(repo.load().await.unwrap().document.products[0].price, 7);
    }

    #[tokio::test]
    async fn test_reload_after_conflict() {
        let repo = memory_repo();
        let mut store = ContentStore::open(repo.clone()).await;
        let moved = repo
            .backend()
            .commit_files("main", &[("notes.txt", "x")], "other editor")
            .unwrap();
        store
            .apply_field_change(&"products.0.price".parse().unwrap(), json!(1))
            .unwrap();
        assert!(store.commit("edit").await.is_err());

        store.reload().await.unwrap();

        assert_eq!(store.revision().map(|r| r.as_str()), Some(moved.as_str()));
        assert_eq!(store.status(), &SaveStatus::Idle);
        assert!(!store.is_dirty());
        store
            .apply_field_change(&"products.0.price".parse().unwrap(), json!(1))
            .unwrap();
        store.commit("edit again").await.unwrap();
    }

    #[tokio::test]
    async fn test_fallback_session_reports_auth_failure() {
        let mut store = ContentStore::open(Arc::new(Unreachable)).await;
        let err = store.commit("edit").await.unwrap_err();

        assert!(matches!(err, SessionError::Repository(ref e) if e.kind() == ErrorKind::Auth));
        assert!(store.notice().is_some());
        assert!(store.status().to_string().contains("sign in again"));
    }
}
