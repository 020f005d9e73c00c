use std::fmt;
use std::path::PathBuf;

use roastery_core::{ContentFile, DocumentError};

/// Errors from loading or saving content.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A file could not be read or its transport encoding was unusable.
    #[error("failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },

    /// A file was read but is not valid content.
    #[error(transparent)]
    Decode(#[from] DocumentError),

    /// The credential was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The branch moved since the document was loaded.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// A required credential or setting is missing.
    #[error("{0}")]
    NotConfigured(String),

    /// A non-atomic save stopped after writing some files.
    #[error("save stopped after writing {}: {source}", written_list(.written))]
    PartialWrite {
        written: Vec<ContentFile>,
        #[source]
        source: Box<RepositoryError>,
    },

    /// The document failed validation and was not saved.
    #[error("invalid document: {0}")]
    Invalid(String),

    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn written_list(files: &[ContentFile]) -> String {
    if files.is_empty() {
        return "no files".to_string();
    }
    files
        .iter()
        .map(|f| f.path())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Coarse classification of a [`RepositoryError`] for user-facing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Fetch,
    Decode,
    Auth,
    NotFound,
    Conflict,
    Transport,
    NotConfigured,
    PartialWrite,
    Invalid,
    Io,
}

impl ErrorKind {
    /// What the user should do next.
    pub fn hint(&self) -> &'static str {
        match self {
            ErrorKind::Auth | ErrorKind::NotConfigured => "check the access token and sign in again",
            ErrorKind::Conflict | ErrorKind::PartialWrite => {
                "someone else saved first; reload and reapply your edits"
            }
            ErrorKind::Transport | ErrorKind::Fetch | ErrorKind::Io => "try again in a moment",
            ErrorKind::Decode | ErrorKind::Invalid => "fix the content and save again",
            ErrorKind::NotFound => "check the repository, branch and file paths",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Fetch => "fetch",
            ErrorKind::Decode => "decode",
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Transport => "transport",
            ErrorKind::NotConfigured => "not configured",
            ErrorKind::PartialWrite => "partial write",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Io => "io",
        };
        write!(f, "{}", name)
    }
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::Fetch { .. } => ErrorKind::Fetch,
            RepositoryError::Decode(_) => ErrorKind::Decode,
            RepositoryError::Auth(_) => ErrorKind::Auth,
            RepositoryError::NotFound(_) => ErrorKind::NotFound,
            RepositoryError::Conflict(_) => ErrorKind::Conflict,
            RepositoryError::Transport(_) => ErrorKind::Transport,
            RepositoryError::NotConfigured(_) => ErrorKind::NotConfigured,
            RepositoryError::PartialWrite { .. } => ErrorKind::PartialWrite,
            RepositoryError::Invalid(_) => ErrorKind::Invalid,
            RepositoryError::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RepositoryError::Io {
            path: path.into(),
            source,
        }
    }
}
