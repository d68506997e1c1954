use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{DocumentStore, DocumentUpload, StorageError};

/// Filesystem-backed store; a mounted volume or network share stands in for the blob store.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
    base_url: String,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StorageError::Rejected(format!("invalid storage key '{key}'")));
        }
        Ok(self.root.join(relative))
    }
}

fn map_io(err: std::io::Error) -> StorageError {
    match err.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted => {
            StorageError::Timeout(err.to_string())
        }
        ErrorKind::PermissionDenied | ErrorKind::InvalidInput => {
            StorageError::Rejected(err.to_string())
        }
        _ => StorageError::Unavailable(err.to_string()),
    }
}

impl DocumentStore for LocalDocumentStore {
    fn put(&self, key: &str, upload: &DocumentUpload) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }
        fs::write(&path, &upload.bytes).map_err(map_io)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(map_io(err)),
        }
    }

    fn download_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}
