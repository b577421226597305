use std::path::PathBuf;

use bon::Builder;
use tracing::debug;

use crate::{backend, namespace::StorageRoot, BackendKind, Entries, Result, StorageBackend};

#[derive(Builder, Debug, Clone)]
pub struct StorageOptions {
    #[builder(into)]
    pub namespace: String,
    #[builder(default)]
    pub backend: BackendKind,
    /// Base directory holding namespace directories. Defaults to `<config_dir>/localstore`.
    #[builder(into)]
    pub base_dir: Option<PathBuf>,
}

impl StorageOptions {
    pub fn resolve_root(&self) -> Result<StorageRoot> {
        match &self.base_dir {
            Some(base) => StorageRoot::resolve_in(base, &self.namespace),
            None => StorageRoot::resolve(&self.namespace),
        }
    }
}

/// The public `localStorage`-style handle: one namespace bound to one backend.
///
/// The binding is fixed at construction. Every operation delegates to the backend.
pub struct LocalStorage {
    namespace: String,
    kind: Option<BackendKind>,
    backend: Box<dyn StorageBackend>,
}

impl LocalStorage {
    /// Opens `namespace` under the user's config directory. `selector` is one of
    /// `text`, `sqlite` or `json`; anything else selects `sqlite`.
    pub fn open(namespace: &str, selector: &str) -> Result<Self> {
        let options =
            StorageOptions::builder().namespace(namespace).backend(BackendKind::from_selector(selector)).build();
        Self::with_options(options)
    }

    pub fn with_options(options: StorageOptions) -> Result<Self> {
        let root = options.resolve_root()?;
        Self::with_root(root, options.backend)
    }

    pub(crate) fn with_root(root: StorageRoot, kind: BackendKind) -> Result<Self> {
        let namespace = root.namespace().to_owned();
        let backend = backend::open(kind, root)?;
        debug!(namespace, backend = %kind, "opened local storage");
        Ok(LocalStorage { namespace, kind: Some(kind), backend })
    }

    pub fn with_backend(namespace: impl Into<String>, backend: Box<dyn StorageBackend>) -> Self {
        LocalStorage { namespace: namespace.into(), kind: None, backend }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `None` when the backend was injected with [`LocalStorage::with_backend`].
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.kind
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.backend.get(key)
    }

    pub fn set_item<V: ToString>(&mut self, key: &str, value: V) -> Result<()> {
        self.backend.set(key, &value.to_string())
    }

    pub fn remove_item(&mut self, key: &str) -> Result<()> {
        self.backend.remove(key)
    }

    pub fn get_all(&self) -> Result<Entries> {
        self.backend.get_all()
    }

    pub fn get_many<K: AsRef<str>>(&self, keys: &[K]) -> Result<Entries> {
        if keys.is_empty() {
            return Ok(Entries::new());
        }
        let keys: Vec<String> = keys.iter().map(|key| key.as_ref().to_owned()).collect();
        self.backend.get_many(&keys)
    }

    pub fn remove_all(&mut self) -> Result<()> {
        self.backend.remove_all()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.backend.clear()
    }
}
