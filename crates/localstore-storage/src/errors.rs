use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationErrorKind),

    #[error("storage unavailable: {0}")]
    Unavailable(#[from] UnavailableErrorKind),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigurationErrorKind {
    #[error("app_namespace may not contain path separators")]
    NamespaceContainsSeparator,

    #[error("failed to get user config directory")]
    NoConfigDirectory,
}

#[derive(Error, Debug)]
pub enum UnavailableErrorKind {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("document error: {0}")]
    Document(#[from] serde_json::Error),

    #[error("key `{0}` names a file owned by another backend")]
    ReservedKey(String),

    #[error("storage worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl StorageError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, StorageError::Configuration(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        UnavailableErrorKind::Io(error).into()
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(error: rusqlite::Error) -> Self {
        UnavailableErrorKind::Sqlite(error).into()
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        UnavailableErrorKind::Document(error).into()
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(error: tokio::task::JoinError) -> Self {
        UnavailableErrorKind::Worker(error).into()
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
