//! Roastery content admin.
//!
//! Loads the storefront's content files, edits them in memory and saves
//! them back as one commit. Shared by the `roastery` CLI and the
//! `roastery-server` content API.

pub mod commands;
pub mod config;
pub mod recommend;
pub mod repository;
pub mod server;
pub mod session;

pub use config::{Config, ConfigError, SourceKind};
pub use repository::{
    build_repository, CommitResult, ContentRepository, ContentSource, ErrorKind, RepositoryError,
    Revision, SaveStrategy, Snapshot,
};
pub use session::{ContentStore, EditError, NewProduct, SaveStatus, SessionError};
