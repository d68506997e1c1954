use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{DocumentStore, DocumentUpload, StorageError};

/// Process-local blob store used by the demo, tests, and deployments without a storage root.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    blobs: Arc<Mutex<HashMap<String, DocumentUpload>>>,
    base_url: String,
}

impl InMemoryDocumentStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            blobs: Arc::default(),
            base_url: base_url.into(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs
            .lock()
            .expect("document mutex poisoned")
            .contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<DocumentUpload> {
        self.blobs
            .lock()
            .expect("document mutex poisoned")
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().expect("document mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new("/documents")
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn put(&self, key: &str, upload: &DocumentUpload) -> Result<(), StorageError> {
        self.blobs
            .lock()
            .expect("document mutex poisoned")
            .insert(key.to_string(), upload.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.blobs
            .lock()
            .expect("document mutex poisoned")
            .remove(key);
        Ok(())
    }

    fn download_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}
