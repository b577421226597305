use std::{
    fs,
    path::{Path, PathBuf},
};

use localstore_config_path::application_dir;
use tracing::debug;

use crate::errors::{ConfigurationErrorKind, Result};

/// Rejects namespaces that would escape or nest inside the storage base directory.
pub fn validate_namespace(namespace: &str) -> std::result::Result<(), ConfigurationErrorKind> {
    if namespace.chars().any(std::path::is_separator) {
        return Err(ConfigurationErrorKind::NamespaceContainsSeparator);
    }
    Ok(())
}

/// The directory owning every file persisted for one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageRoot {
    namespace: String,
    path: PathBuf,
}

impl StorageRoot {
    /// Resolves `<config_dir>/localstore/<namespace>` and creates it if missing.
    pub fn resolve(namespace: &str) -> Result<Self> {
        validate_namespace(namespace)?;
        let base = application_dir().ok_or(ConfigurationErrorKind::NoConfigDirectory)?;
        Self::create(base, namespace)
    }

    /// Resolves `<base>/<namespace>` and creates it if missing.
    pub fn resolve_in<P>(base: P, namespace: &str) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        validate_namespace(namespace)?;
        Self::create(base.as_ref().to_path_buf(), namespace)
    }

    fn create(base: PathBuf, namespace: &str) -> Result<Self> {
        let root = StorageRoot { namespace: namespace.to_owned(), path: base.join(namespace) };
        root.ensure()?;
        debug!(namespace, path = %root.path.display(), "resolved storage root");
        Ok(root)
    }

    /// Creates the directory and any missing parents. Existing contents are untouched.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.path)?;
        Ok(())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.path.join(name)
    }
}
