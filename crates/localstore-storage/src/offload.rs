//! Runs the synchronous storage operations on Tokio's blocking pool.
//!
//! Each backend instance is guarded by a mutex and never re-opened per call.
//! Instances opened through [`AsyncLocalStorage::open`] are shared per storage
//! root and backend, so one process never has two unsynchronized writers on the
//! same files.

use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{Arc, PoisonError, Weak},
};

use once_cell::sync::Lazy;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{facade::StorageOptions, BackendKind, Entries, LocalStorage, Result};

type SharedStorage = Arc<Mutex<LocalStorage>>;

static OPEN_STORAGES: Lazy<std::sync::Mutex<HashMap<(PathBuf, BackendKind), Weak<Mutex<LocalStorage>>>>> =
    Lazy::new(Default::default);

#[trait_variant::make(AsyncStorage: Send)]
pub trait LocalAsyncStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item<V: ToString + Send>(&self, key: &str, value: V) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;
    async fn get_all(&self) -> Result<Entries>;
    async fn get_many<K: AsRef<str> + Sync>(&self, keys: &[K]) -> Result<Entries>;
    async fn remove_all(&self) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct AsyncLocalStorage {
    inner: SharedStorage,
}

impl AsyncLocalStorage {
    /// Opens `options`, reusing the instance already open in this process for the
    /// same storage root and backend.
    pub async fn open(options: StorageOptions) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::open_shared(options)).await?
    }

    /// Wraps an already opened storage without registering it for sharing.
    pub fn from_storage(storage: LocalStorage) -> Self {
        AsyncLocalStorage { inner: Arc::new(Mutex::new(storage)) }
    }

    fn open_shared(options: StorageOptions) -> Result<Self> {
        let root = options.resolve_root()?;
        let path = fs::canonicalize(root.path()).unwrap_or_else(|_| root.path().to_path_buf());
        let key = (path, options.backend);

        let mut registry = OPEN_STORAGES.lock().unwrap_or_else(PoisonError::into_inner);
        registry.retain(|_, storage| storage.strong_count() > 0);

        if let Some(inner) = registry.get(&key).and_then(Weak::upgrade) {
            debug!(namespace = %options.namespace, backend = %options.backend, "reusing open storage");
            return Ok(AsyncLocalStorage { inner });
        }

        let inner = Arc::new(Mutex::new(LocalStorage::with_root(root, options.backend)?));
        registry.insert(key, Arc::downgrade(&inner));
        Ok(AsyncLocalStorage { inner })
    }

    /// Returns `true` when both handles drive the same backend instance.
    pub fn shares_backend_with(&self, other: &AsyncLocalStorage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    async fn run<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut LocalStorage) -> Result<T> + Send + 'static,
    {
        let mut storage = self.inner.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || operation(&mut *storage)).await?
    }
}

impl AsyncStorage for AsyncLocalStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_owned();
        self.run(move |storage| storage.get_item(&key)).await
    }

    async fn set_item<V: ToString + Send>(&self, key: &str, value: V) -> Result<()> {
        let (key, value) = (key.to_owned(), value.to_string());
        self.run(move |storage| storage.set_item(&key, value)).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let key = key.to_owned();
        self.run(move |storage| storage.remove_item(&key)).await
    }

    async fn get_all(&self) -> Result<Entries> {
        self.run(|storage| storage.get_all()).await
    }

    async fn get_many<K: AsRef<str> + Sync>(&self, keys: &[K]) -> Result<Entries> {
        if keys.is_empty() {
            return Ok(Entries::new());
        }
        let keys: Vec<String> = keys.iter().map(|key| key.as_ref().to_owned()).collect();
        self.run(move |storage| storage.get_many(&keys)).await
    }

    async fn remove_all(&self) -> Result<()> {
        self.run(|storage| storage.remove_all()).await
    }

    async fn clear(&self) -> Result<()> {
        self.run(|storage| storage.clear()).await
    }
}
