use crate::{namespace::StorageRoot, BackendKind, Result, StorageBackend};

pub mod document;
pub mod file;
pub mod sqlite;

pub use document::DocumentStorage;
pub use file::FileStorage;
pub use sqlite::SqliteStorage;

pub const SQLITE_FILE_NAME: &str = "localStorage.db";
pub const DOCUMENT_FILE_NAME: &str = "localStorage.json";

/// Files owned by the relational and document backends. The flat-file backend
/// neither lists nor deletes them, so backends sharing a namespace stay disjoint.
pub(crate) fn is_reserved_file_name(name: &str) -> bool {
    name == DOCUMENT_FILE_NAME
        || name.starts_with(&format!("{DOCUMENT_FILE_NAME}."))
        || name == SQLITE_FILE_NAME
        || ["-journal", "-wal", "-shm"].iter().any(|suffix| name == format!("{SQLITE_FILE_NAME}{suffix}"))
}

pub fn open(kind: BackendKind, root: StorageRoot) -> Result<Box<dyn StorageBackend>> {
    Ok(match kind {
        BackendKind::FlatFile => Box::new(FileStorage::new(root)),
        BackendKind::Relational => Box::new(SqliteStorage::open(root)?),
        BackendKind::Document => Box::new(DocumentStorage::open(root)?),
    })
}
