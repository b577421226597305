//! A `localStorage`-style key-value store persisted per application namespace.
//!
//! Every namespace owns one directory, by default `<config_dir>/localstore/<namespace>`.
//! Three interchangeable backends persist entries inside it:
//!
//! | Backend | On disk |
//! |---|---|
//! | [`BackendKind::FlatFile`] | one file per key |
//! | [`BackendKind::Relational`] | `localStorage.db`, a SQLite table `(key, value)` |
//! | [`BackendKind::Document`] | `localStorage.json`, one flat JSON object |
//!
//! All backends behave identically for the same sequence of operations. Data written by
//! one backend is not visible to another, even within the same namespace.
//!
//! Two instances opened on the same namespace and backend are not coordinated. The
//! relational backend relies on SQLite's own locking; the flat-file and document backends
//! are last-writer-wins. [`AsyncLocalStorage`] serializes access within one process.

use std::{collections::HashMap, fmt, str::FromStr};

use tracing::warn;

pub mod backend;
pub mod errors;
pub mod facade;
pub mod namespace;
pub mod offload;


pub use errors::{ConfigurationErrorKind, Result, StorageError, UnavailableErrorKind};
pub use facade::{LocalStorage, StorageOptions};
pub use namespace::{validate_namespace, StorageRoot};
pub use offload::{AsyncLocalStorage, AsyncStorage, LocalAsyncStorage};

/// Key to value mapping returned by bulk reads. Iteration order is unspecified.
pub type Entries = HashMap<String, String>;

/// Persistence contract shared by every backend.
///
/// A missing key is never an error: `get` reports `None` and `remove` does nothing.
#[cfg_attr(test, mockall::automock)]
pub trait StorageBackend: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
    fn get_all(&self) -> Result<Entries>;
    /// Returns only the requested keys that are present. Duplicates collapse.
    fn get_many(&self, keys: &[String]) -> Result<Entries>;
    fn remove_all(&mut self) -> Result<()>;
    /// Resets to the empty state. The backend stays usable afterwards.
    fn clear(&mut self) -> Result<()>;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BackendKind {
    FlatFile,
    #[default]
    Relational,
    Document,
}

impl BackendKind {
    /// Maps a selector string onto a backend. Unknown selectors fall back to
    /// [`BackendKind::Relational`].
    pub fn from_selector(selector: &str) -> Self {
        selector.parse().unwrap_or_else(|_| {
            warn!(selector, "unknown storage backend, falling back to relational");
            BackendKind::Relational
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::FlatFile => "text",
            BackendKind::Relational => "sqlite",
            BackendKind::Document => "json",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownBackend(pub String);

impl fmt::Display for UnknownBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown storage backend `{}`", self.0)
    }
}

impl std::error::Error for UnknownBackend {}

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "flat-file" | "flatfile" | "file" => Ok(BackendKind::FlatFile),
            "sqlite" | "relational" => Ok(BackendKind::Relational),
            "json" | "document" => Ok(BackendKind::Document),
            _ => Err(UnknownBackend(s.to_owned())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
