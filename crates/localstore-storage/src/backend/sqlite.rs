use std::collections::HashSet;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use crate::{backend::SQLITE_FILE_NAME, namespace::StorageRoot, Entries, Result, StorageBackend};

const TABLE_NAME: &str = "localStorage";

/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER` on older builds.
const MAX_BOUND_PARAMETERS: usize = 999;

/// Stores entries as rows of a single `(key, value)` table in `localStorage.db`.
///
/// The connection is held for the lifetime of the instance and every mutation
/// commits immediately.
pub struct SqliteStorage {
    connection: Connection,
}

impl SqliteStorage {
    pub fn open(root: StorageRoot) -> Result<Self> {
        let path = root.join(SQLITE_FILE_NAME);
        let connection = Connection::open(&path)?;
        let storage = SqliteStorage { connection };

        if !storage.has_table()? {
            storage.create_table()?;
        }

        debug!(path = %path.display(), "opened sqlite storage");
        Ok(storage)
    }

    fn has_table(&self) -> Result<bool> {
        let found = self
            .connection
            .query_row("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1", [TABLE_NAME], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn create_table(&self) -> Result<()> {
        self.connection.execute_batch(&format!(r#"CREATE TABLE {TABLE_NAME} (key TEXT PRIMARY KEY, value TEXT);"#))?;
        Ok(())
    }
}

impl StorageBackend for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .connection
            .query_row(&format!("SELECT value FROM {TABLE_NAME} WHERE key = ?1"), [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.connection.execute(
            &format!(
                r#"INSERT INTO {TABLE_NAME} (key, value) VALUES (?1, ?2)
                   ON CONFLICT (key) DO UPDATE SET value = excluded.value;"#
            ),
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.connection.execute(&format!("DELETE FROM {TABLE_NAME} WHERE key = ?1"), [key])?;
        Ok(())
    }

    fn get_all(&self) -> Result<Entries> {
        let mut statement = self.connection.prepare(&format!("SELECT key, value FROM {TABLE_NAME}"))?;
        let entries = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Entries, _>>()?;
        Ok(entries)
    }

    fn get_many(&self, keys: &[String]) -> Result<Entries> {
        let mut seen = HashSet::new();
        let keys: Vec<&str> = keys.iter().map(String::as_str).filter(|key| seen.insert(*key)).collect();

        let mut entries = Entries::new();
        for chunk in keys.chunks(MAX_BOUND_PARAMETERS) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut statement =
                self.connection.prepare(&format!("SELECT key, value FROM {TABLE_NAME} WHERE key IN ({placeholders})"))?;
            let rows = statement.query_map(params_from_iter(chunk.iter()), |row| Ok((row.get(0)?, row.get(1)?)))?;
            for row in rows {
                let (key, value): (String, String) = row?;
                entries.insert(key, value);
            }
        }
        Ok(entries)
    }

    fn remove_all(&mut self) -> Result<()> {
        self.connection.execute(&format!("DELETE FROM {TABLE_NAME}"), [])?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        // Dropping the transaction on an early return rolls it back, leaving the
        // connection in autocommit mode.
        let transaction = self.connection.transaction()?;
        transaction.execute_batch(&format!(
            r#"DROP TABLE IF EXISTS {TABLE_NAME};
               CREATE TABLE {TABLE_NAME} (key TEXT PRIMARY KEY, value TEXT);"#
        ))?;
        transaction.commit()?;
        debug!("recreated sqlite storage table");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use rusqlite::Connection;

    use super::{SqliteStorage, TABLE_NAME};
    use crate::{backend::SQLITE_FILE_NAME, namespace::StorageRoot, StorageBackend};

    fn root(base: &tempfile::TempDir) -> StorageRoot {
        StorageRoot::resolve_in(base.path(), "test.sqlite").expect("resolution should be successful")
    }

    #[test]
    fn opening_an_empty_database_should_create_the_table() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let root = root(&base);

        let storage = SqliteStorage::open(root.clone()).expect("opening should be successful");

        assert!(storage.has_table().expect("schema lookup should be successful"));
        assert!(root.join(SQLITE_FILE_NAME).is_file());
    }

    #[test]
    fn set_should_upsert_a_single_row() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let root = root(&base);
        let mut storage = SqliteStorage::open(root.clone()).expect("opening should be successful");

        storage.set("k", "v1").expect("set should be successful");
        storage.set("k", "v2").expect("set should be successful");

        let external = Connection::open(root.join(SQLITE_FILE_NAME)).expect("opening db should be successful");
        let (count, value): (i64, String) = external
            .query_row(&format!("SELECT COUNT(*), MAX(value) FROM {TABLE_NAME}"), [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .expect("query should be successful");
        assert_eq!(count, 1);
        assert_eq!(value, "v2");
    }

    #[test]
    fn get_many_should_collapse_duplicates_and_span_parameter_chunks() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let mut storage = SqliteStorage::open(root(&base)).expect("opening should be successful");
        storage.set("first", "1").expect("set should be successful");
        storage.set("last", "2").expect("set should be successful");

        let mut keys: Vec<String> = (0..2500).map(|i| format!("missing-{i}")).collect();
        keys.insert(0, "first".to_owned());
        keys.push("first".to_owned());
        keys.push("last".to_owned());

        let entries = storage.get_many(&keys).expect("get_many should be successful");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get("first").map(String::as_str), Some("1"));
        assert_eq!(entries.get("last").map(String::as_str), Some("2"));
    }

    #[test]
    fn clear_should_leave_a_usable_empty_table() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let mut storage = SqliteStorage::open(root(&base)).expect("opening should be successful");
        storage.set("a", "1").expect("set should be successful");

        storage.clear().expect("clear should be successful");

        assert!(storage.get_all().expect("get_all should be successful").is_empty());
        storage.set("b", "2").expect("set after clear should be successful");
        assert_eq!(storage.get("b").expect("get should be successful").as_deref(), Some("2"));
    }

    #[test]
    fn when_clear_fails_later_writes_should_still_commit() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");
        let root = root(&base);
        let mut storage = SqliteStorage::open(root.clone()).expect("opening should be successful");
        storage.set("before", "1").expect("set should be successful");
        storage.connection.busy_timeout(Duration::ZERO).expect("setting busy timeout should be successful");

        let blocker = Connection::open(root.join(SQLITE_FILE_NAME)).expect("opening db should be successful");
        blocker.execute_batch("BEGIN IMMEDIATE;").expect("locking db should be successful");

        assert!(storage.clear().is_err_and(|e| e.is_unavailable()));
        assert!(storage.connection.is_autocommit());

        blocker.execute_batch("COMMIT;").expect("releasing lock should be successful");
        storage.set("after", "2").expect("set after failed clear should be successful");
        drop(storage);

        let reopened = SqliteStorage::open(root).expect("reopening should be successful");
        assert_eq!(reopened.get("after").expect("get should be successful").as_deref(), Some("2"));
        assert_eq!(reopened.get("before").expect("get should be successful").as_deref(), Some("1"));
    }
}
