//! Error types for the dedup index.
//!
//! Every fallible operation returns [`DedupError`]. The variants follow the
//! failure categories callers branch on; [`DedupError::kind`] exposes that
//! category without matching on payloads.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure category of a [`DedupError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OpenRepo,
    CreateRepo,
    ModifyRepo,
    DeleteRepo,
    RenameRepo,
    Load,
    Write,
    Close,
    UpdateRepo,
    Io,
    Config,
    General,
}

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("Failed to open repo: {0}")]
    OpenRepo(String),

    #[error("Failed to create repo: {0}")]
    CreateRepo(String),

    #[error("Failed to modify repo: {0}")]
    ModifyRepo(String),

    #[error("Failed to delete repo: {0}")]
    DeleteRepo(String),

    #[error("Failed to rename repo: {0}")]
    RenameRepo(String),

    #[error("Failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to close {}: {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Update failed: {0}")]
    UpdateRepo(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    General(String),
}

impl DedupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DedupError::OpenRepo(_) => ErrorKind::OpenRepo,
            DedupError::CreateRepo(_) => ErrorKind::CreateRepo,
            DedupError::ModifyRepo(_) => ErrorKind::ModifyRepo,
            DedupError::DeleteRepo(_) => ErrorKind::DeleteRepo,
            DedupError::RenameRepo(_) => ErrorKind::RenameRepo,
            DedupError::Load { .. } => ErrorKind::Load,
            DedupError::Write { .. } => ErrorKind::Write,
            DedupError::Close { .. } => ErrorKind::Close,
            DedupError::UpdateRepo(_) => ErrorKind::UpdateRepo,
            DedupError::Io(_) => ErrorKind::Io,
            DedupError::Config(_) => ErrorKind::Config,
            DedupError::General(_) => ErrorKind::General,
        }
    }

    pub(crate) fn load(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DedupError::Load {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DedupError::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn close(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DedupError::Close {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for DedupError {
    fn from(err: config::ConfigError) -> Self {
        DedupError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DedupError>;
