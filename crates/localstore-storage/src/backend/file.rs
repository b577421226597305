use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{
    backend::is_reserved_file_name, errors::UnavailableErrorKind, namespace::StorageRoot, Entries, Result,
    StorageBackend,
};

/// Stores each entry as a file named after its key, directly under the storage root.
///
/// Keys are used verbatim as file names. Keys containing path separators, `..`,
/// or names the platform reserves are not supported. Keys naming the relational
/// or document backends' files are refused by `set` and read as absent, so a
/// namespace shared between backends never has one overwrite another's file.
pub struct FileStorage {
    root: StorageRoot,
}

impl FileStorage {
    pub fn new(root: StorageRoot) -> Self {
        debug!(path = %root.path().display(), "opened flat-file storage");
        FileStorage { root }
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

fn read_if_file(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    match fs::read_to_string(path) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if is_reserved_file_name(key) {
            return Ok(None);
        }
        read_if_file(&self.file_path(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if is_reserved_file_name(key) {
            return Err(UnavailableErrorKind::ReservedKey(key.to_owned()).into());
        }
        fs::write(self.file_path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if is_reserved_file_name(key) {
            return Ok(());
        }
        let path = self.file_path(key);
        if !path.is_file() {
            return Ok(());
        }
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn get_all(&self) -> Result<Entries> {
        let mut entries = Entries::new();
        if !self.root.path().is_dir() {
            return Ok(entries);
        }

        for entry in fs::read_dir(self.root.path())? {
            let entry = entry?;
            let Ok(key) = entry.file_name().into_string() else {
                warn!(name = ?entry.file_name(), "skipping file with a non UTF-8 name");
                continue;
            };
            if is_reserved_file_name(&key) {
                continue;
            }
            if let Some(value) = read_if_file(&entry.path())? {
                entries.insert(key, value);
            }
        }

        Ok(entries)
    }

    fn get_many(&self, keys: &[String]) -> Result<Entries> {
        let mut entries = Entries::new();
        for key in keys {
            if entries.contains_key(key) {
                continue;
            }
            if let Some(value) = self.get(key)? {
                entries.insert(key.clone(), value);
            }
        }
        Ok(entries)
    }

    fn remove_all(&mut self) -> Result<()> {
        self.clear()
    }

    fn clear(&mut self) -> Result<()> {
        let root = self.root.path();
        if root.is_dir() {
            make_writable(root, true);
            for entry in fs::read_dir(root)? {
                let entry = entry?;
                if entry.file_name().to_str().is_some_and(is_reserved_file_name) {
                    continue;
                }
                force_remove(&entry.path())?;
            }
        }
        debug!(path = %root.display(), "cleared flat-file storage");
        self.root.ensure()
    }
}

/// Removes a file or directory tree, lifting read-only permissions on the way.
fn force_remove(path: &Path) -> Result<()> {
    if !path.symlink_metadata()?.is_dir() {
        make_writable(path, false);
        fs::remove_file(path)?;
        return Ok(());
    }

    // Directories have to be writable before their children can be unlinked.
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            make_writable(entry.path(), true);
        }
    }

    for entry in WalkDir::new(path).contents_first(true) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())?;
        } else {
            make_writable(entry.path(), false);
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Best effort; a failure is logged and removal is attempted anyway.
fn make_writable(path: &Path, is_dir: bool) {
    let permissions = match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => return,
        Ok(metadata) => metadata.permissions(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read permissions");
            return;
        }
    };

    let Some(permissions) = writable(permissions, is_dir) else {
        return;
    };
    if let Err(e) = fs::set_permissions(path, permissions) {
        warn!(path = %path.display(), error = %e, "failed to make path writable");
    }
}

#[cfg(unix)]
fn writable(mut permissions: fs::Permissions, is_dir: bool) -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    let required = if is_dir { 0o700 } else { 0o200 };
    let mode = permissions.mode();
    if mode & required == required {
        return None;
    }
    permissions.set_mode(mode | required);
    Some(permissions)
}

#[cfg(not(unix))]
fn writable(mut permissions: fs::Permissions, _is_dir: bool) -> Option<fs::Permissions> {
    if !permissions.readonly() {
        return None;
    }
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
    Some(permissions)
}
