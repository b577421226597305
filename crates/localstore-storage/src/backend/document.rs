use std::{
    fs,
    io::{BufWriter, Write},
    path::PathBuf,
};

use tracing::debug;

use crate::{backend::DOCUMENT_FILE_NAME, namespace::StorageRoot, Entries, Result, StorageBackend};

/// Keeps the whole namespace in memory and mirrors it to `localStorage.json`.
///
/// Reads are served from memory. Every mutation rewrites the complete document
/// before returning, through a temp file renamed over the previous version. A
/// mutation whose write fails leaves the in-memory entries as they were.
pub struct DocumentStorage {
    root: StorageRoot,
    path: PathBuf,
    entries: Entries,
}

impl DocumentStorage {
    pub fn open(root: StorageRoot) -> Result<Self> {
        let path = root.join(DOCUMENT_FILE_NAME);
        let mut storage = DocumentStorage { root, path, entries: Entries::new() };

        if !storage.path.is_file() {
            storage.persist()?;
        }
        storage.entries = serde_json::from_slice(&fs::read(&storage.path)?)?;

        debug!(path = %storage.path.display(), entries = storage.entries.len(), "opened document storage");
        Ok(storage)
    }

    fn persist(&self) -> Result<()> {
        let temp = tempfile::Builder::new().prefix(&format!("{DOCUMENT_FILE_NAME}.")).tempfile_in(self.root.path())?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, &self.entries)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn reset_document(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        self.persist()
    }
}

impl StorageBackend for DocumentStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.entries.insert(key.to_owned(), value.to_owned());
        self.persist().inspect_err(|_| match previous {
            Some(previous) => {
                self.entries.insert(key.to_owned(), previous);
            }
            None => {
                self.entries.remove(key);
            }
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let Some(previous) = self.entries.remove(key) else {
            return Ok(());
        };
        self.persist().inspect_err(|_| {
            self.entries.insert(key.to_owned(), previous);
        })
    }

    fn get_all(&self) -> Result<Entries> {
        Ok(self.entries.clone())
    }

    fn get_many(&self, keys: &[String]) -> Result<Entries> {
        Ok(keys.iter().filter_map(|key| self.entries.get_key_value(key)).map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn remove_all(&mut self) -> Result<()> {
        self.clear()
    }

    fn clear(&mut self) -> Result<()> {
        let previous = std::mem::take(&mut self.entries);
        let result = self.reset_document();
        if result.is_err() {
            self.entries = previous;
        }
        result
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::DocumentStorage;
    use crate::{backend::DOCUMENT_FILE_NAME, namespace::StorageRoot, StorageBackend, StorageError};

    fn root(base: &tempfile::TempDir) -> StorageRoot {
        StorageRoot::resolve_in(base.path(), "test.document").expect("resolution should be successful")
    }

    #[test]
    fn opening_should_write_an_empty_document_when_missing() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let root = root(&base);

        DocumentStorage::open(root.clone()).expect("opening should be successful");

        let written = fs::read_to_string(root.join(DOCUMENT_FILE_NAME)).expect("document should exist");
        assert_eq!(written, "{}");
    }

    #[test]
    fn mutations_should_rewrite_the_whole_document() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let root = root(&base);
        let mut storage = DocumentStorage::open(root.clone()).expect("opening should be successful");

        storage.set("a", "1").expect("set should be successful");
        storage.set("b", "2").expect("set should be successful");
        storage.remove("a").expect("remove should be successful");

        let written = fs::read_to_string(root.join(DOCUMENT_FILE_NAME)).expect("document should exist");
        let parsed: serde_json::Value = serde_json::from_str(&written).expect("document should be valid json");
        assert_eq!(parsed, serde_json::json!({ "b": "2" }));
    }

    #[test]
    fn persisting_should_not_leave_temp_files_behind() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let root = root(&base);
        let mut storage = DocumentStorage::open(root.clone()).expect("opening should be successful");

        storage.set("a", "1").expect("set should be successful");

        let names: Vec<_> = fs::read_dir(root.path())
            .expect("reading dir should be successful")
            .map(|entry| entry.expect("entry should be readable").file_name())
            .collect();
        assert_eq!(names, vec![DOCUMENT_FILE_NAME]);
    }

    #[test]
    fn when_document_is_corrupt_opening_should_fail_as_unavailable() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let root = root(&base);
        fs::write(root.join(DOCUMENT_FILE_NAME), "{ not json").expect("writing file should be successful");

        let result = DocumentStorage::open(root);

        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }

    #[test]
    fn when_document_holds_non_string_values_opening_should_fail() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let root = root(&base);
        fs::write(root.join(DOCUMENT_FILE_NAME), r#"{"n": 1}"#).expect("writing file should be successful");

        let result = DocumentStorage::open(root);

        assert!(result.is_err_and(|e| e.is_unavailable()));
    }

    #[test]
    fn reads_should_be_served_from_memory() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let root = root(&base);
        let mut storage = DocumentStorage::open(root.clone()).expect("opening should be successful");
        storage.set("a", "1").expect("set should be successful");

        fs::remove_file(root.join(DOCUMENT_FILE_NAME)).expect("removing document should be successful");

        assert_eq!(storage.get("a").expect("get should be successful").as_deref(), Some("1"));
        assert_eq!(storage.get_all().expect("get_all should be successful").len(), 1);
    }

    #[test]
    fn when_writing_fails_memory_should_keep_the_previous_entries() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let root = root(&base);
        let mut storage = DocumentStorage::open(root.clone()).expect("opening should be successful");
        storage.set("kept", "1").expect("set should be successful");

        fs::remove_dir_all(root.path()).expect("removing root should be successful");

        assert!(storage.set("k", "v").is_err_and(|e| e.is_unavailable()));
        assert!(storage.set("kept", "2").is_err());
        assert!(storage.remove("kept").is_err());
        assert!(storage.clear().is_err());

        assert_eq!(storage.get("k").expect("get should be successful"), None);
        assert_eq!(storage.get("kept").expect("get should be successful").as_deref(), Some("1"));
        assert_eq!(storage.get_all().expect("get_all should be successful").len(), 1);
    }
}
