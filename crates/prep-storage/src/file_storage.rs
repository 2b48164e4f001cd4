use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use prep_core::storage::{LocalStorage, StorageError};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Directory-backed `LocalStorage`: one file per entry, written atomically.
/// Values are stored as given; encryption is the caller's concern.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(sanitize_name(name))
    }
}

impl LocalStorage for FileStorage {
    #[instrument(skip_all, fields(name = %name))]
    fn get_item(&self, name: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(name)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_err(err)),
        }
    }

    #[instrument(skip_all, fields(name = %name))]
    fn set_item(&self, name: &str, value: &str) -> Result<(), StorageError> {
        write_atomic(&self.path_for(name), value.as_bytes())
    }

    #[instrument(skip_all, fields(name = %name))]
    fn remove_item(&self, name: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(name)) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_err(err)),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let parent = path.parent().ok_or_else(|| StorageError::Unavailable {
        reason: "invalid storage path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    tmp.write_all(bytes).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn sanitize_name(name: &str) -> String {
    URL_SAFE_NO_PAD.encode(name)
}

fn storage_err<E: ToString>(err: E) -> StorageError {
    StorageError::Unavailable {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_and_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get_item("history").expect("get"), None);
        storage.set_item("history", "one").expect("set");
        storage.set_item("history", "two").expect("overwrite");
        assert_eq!(
            storage.get_item("history").expect("get").as_deref(),
            Some("two")
        );
    }

    #[test]
    fn names_cannot_escape_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path());
        storage.set_item("../outside", "v").expect("set");

        let path = storage.path_for("../outside");
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.exists());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path());
        storage.set_item("k", "v").expect("set");
        storage.remove_item("k").expect("remove");
        storage.remove_item("k").expect("remove again");
        assert_eq!(storage.get_item("k").expect("get"), None);
    }

    #[test]
    fn reopened_storage_sees_previous_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        FileStorage::new(dir.path())
            .set_item("k", "persisted")
            .expect("set");

        let reopened = FileStorage::new(dir.path());
        assert_eq!(
            reopened.get_item("k").expect("get").as_deref(),
            Some("persisted")
        );
    }

    #[test]
    fn encrypted_store_over_files_survives_reopen() {
        use crate::encrypted_store::EncryptedStore;

        let dir = tempfile::tempdir().expect("tempdir");
        let store = EncryptedStore::new(FileStorage::new(dir.path()), "seed");
        store
            .set_item("workspace/session", &vec!["hello-prep"])
            .expect("set");

        let stored = fs::read_to_string(store_path(dir.path(), "workspace/session"))
            .expect("read ciphertext");
        assert!(!stored.contains("hello-prep"), "plaintext must not be stored");

        let reopened = EncryptedStore::new(FileStorage::new(dir.path()), "seed");
        assert_eq!(
            reopened.get_item::<Vec<String>>("workspace/session"),
            Some(vec!["hello-prep".to_string()])
        );
    }

    fn store_path(root: &Path, name: &str) -> PathBuf {
        FileStorage::new(root).path_for(name)
    }
}
