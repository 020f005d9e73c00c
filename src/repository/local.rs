//! Content files in a directory on disk.
//!
//! ```text
//! <root>/
//!   content/site.json
//!   content/navigation.json
//!   content/products.json
//! ```
//!
//! Each file is replaced atomically (temp file + fsync + rename). The three
//! renames are separate, so a crash between them can leave a mix of old and
//! new files. A write that fails after the first file is reported as
//! [`RepositoryError::PartialWrite`].

use async_trait::async_trait;
use roastery_core::{ContentDocument, ContentFile};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{
    encode_all, ensure_valid, CommitResult, ContentRepository, RepositoryError, Revision,
    SaveStrategy, Snapshot,
};

/// A [`ContentRepository`] over a local directory.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, file: ContentFile) -> PathBuf {
        self.root.join(file.path())
    }

    async fn read_file(&self, file: ContentFile) -> Result<String, RepositoryError> {
        let path = self.file_path(file);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    RepositoryError::NotFound(path.display().to_string())
                }
                _ => RepositoryError::Fetch {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                },
            })
    }

    async fn read_all(&self) -> Result<[String; 3], RepositoryError> {
        let (site, navigation, products) = futures::try_join!(
            self.read_file(ContentFile::Site),
            self.read_file(ContentFile::Navigation),
            self.read_file(ContentFile::Products),
        )?;
        Ok([site, navigation, products])
    }

    async fn write_file(&self, file: ContentFile, text: &str) -> Result<(), RepositoryError> {
        let path = self.file_path(file);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::io(parent, e))?;
        }

        // Write atomically using temp file + rename
        let temp_path = path.with_extension("json.tmp");
        let mut temp = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| RepositoryError::io(&temp_path, e))?;
        temp.write_all(text.as_bytes())
            .await
            .map_err(|e| RepositoryError::io(&temp_path, e))?;
        temp.sync_all()
            .await
            .map_err(|e| RepositoryError::io(&temp_path, e))?;
        drop(temp);

        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| RepositoryError::io(&path, e))
    }
}

/// Digest over the three files, in a fixed order.
fn digest(files: &[String]) -> Revision {
    let mut hasher = Sha256::new();
    for text in files {
        hasher.update((text.len() as u64).to_be_bytes());
        hasher.update(text.as_bytes());
    }
    Revision::new(format!("{:x}", hasher.finalize()))
}

#[async_trait]
impl ContentRepository for LocalRepository {
    async fn load(&self) -> Result<Snapshot, RepositoryError> {
        let [site, navigation, products] = self.read_all().await?;
        let document = ContentDocument::from_files(&site, &navigation, &products)?;
        let revision = digest(&[site, navigation, products]);

        tracing::info!("Loaded content from {}", self.root.display());
        Ok(Snapshot { document, revision })
    }

    async fn save(
        &self,
        document: &ContentDocument,
        message: &str,
        base: Option<&Revision>,
    ) -> Result<CommitResult, RepositoryError> {
        ensure_valid(document)?;
        let files = encode_all(document)?;

        let previous = match self.read_all().await {
            Ok(current) => Some(digest(&current)),
            Err(RepositoryError::NotFound(_)) if base.is_none() => None,
            Err(e) => return Err(e),
        };
        if let (Some(base), Some(current)) = (base, previous.as_ref()) {
            if base != current {
                return Err(RepositoryError::Conflict(format!(
                    "content in {} changed since it was loaded",
                    self.root.display()
                )));
            }
        }

        let mut written = Vec::new();
        for (file, text) in &files {
            match self.write_file(*file, text).await {
                Ok(()) => {
                    tracing::debug!("Wrote {}", self.file_path(*file).display());
                    written.push(*file);
                }
                Err(e) if written.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!("Local save stopped after {} file(s): {}", written.len(), e);
                    return Err(RepositoryError::PartialWrite {
                        written,
                        source: Box::new(e),
                    });
                }
            }
        }

        let texts: Vec<String> = files.iter().map(|(_, text)| text.clone()).collect();
        let revision = digest(&texts);
        tracing::info!("Saved content to {}: {}", self.root.display(), message);

        Ok(CommitResult {
            revision,
            previous,
            files: files.iter().map(|(f, _)| f.path().to_string()).collect(),
            message: message.to_string(),
            strategy: SaveStrategy::PerFile,
        })
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}
