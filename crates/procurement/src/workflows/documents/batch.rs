use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::{storage_key, DocumentKind, DocumentRef, DocumentStore, DocumentUpload, StorageError};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

/// Bounded retry applied to document store calls at the operation boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// No sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}

/// Run `call` until it succeeds, fails permanently, or the attempts run out.
pub fn with_retry<T, F>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Result<T, StorageError>,
{
    let mut attempt = 1;
    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                warn!(operation, attempt, error = %err, "document store call failed, retrying");
                if !policy.backoff.is_zero() {
                    thread::sleep(policy.backoff * attempt);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// A set of uploads that either all survive or are all removed again.
///
/// Documents stay in the store only once [`UploadBatch::commit`] is called; dropping an
/// uncommitted batch deletes everything it stored.
pub struct UploadBatch<'a, D: DocumentStore + ?Sized> {
    store: &'a D,
    policy: &'a RetryPolicy,
    owner: String,
    stored: Vec<DocumentRef>,
    committed: bool,
}

impl<'a, D: DocumentStore + ?Sized> UploadBatch<'a, D> {
    pub fn new(store: &'a D, policy: &'a RetryPolicy, owner: impl Into<String>) -> Self {
        Self {
            store,
            policy,
            owner: owner.into(),
            stored: Vec::new(),
            committed: false,
        }
    }

    pub fn upload(
        &mut self,
        kind: DocumentKind,
        upload: &DocumentUpload,
    ) -> Result<DocumentRef, StorageError> {
        let key = storage_key(&self.owner, kind, &upload.file_name);
        with_retry(self.policy, "put", || self.store.put(&key, upload))?;

        let reference = DocumentRef {
            kind,
            storage_key: key,
            file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            size: upload.bytes.len() as u64,
            sha256: upload.digest(),
        };
        debug!(key = %reference.storage_key, size = reference.size, "document stored");
        self.stored.push(reference.clone());
        Ok(reference)
    }

    pub fn len(&self) -> usize {
        self.stored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    /// Keep the uploaded documents.
    pub fn commit(mut self) -> Vec<DocumentRef> {
        self.committed = true;
        std::mem::take(&mut self.stored)
    }

    fn discard(&mut self) {
        for reference in self.stored.drain(..) {
            let key = reference.storage_key;
            if let Err(err) = with_retry(self.policy, "delete", || self.store.delete(&key)) {
                warn!(%key, error = %err, "failed to remove orphaned document");
            }
        }
    }
}

impl<D: DocumentStore + ?Sized> Drop for UploadBatch<'_, D> {
    fn drop(&mut self) {
        if !self.committed {
            self.discard();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::documents::InMemoryDocumentStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        inner: InMemoryDocumentStore,
        failures_left: AtomicU32,
        error: StorageError,
    }

    impl DocumentStore for Flaky {
        fn put(&self, key: &str, upload: &DocumentUpload) -> Result<(), StorageError> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(self.error.clone());
            }
            self.inner.put(key, upload)
        }

        fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.inner.delete(key)
        }

        fn download_url(&self, key: &str) -> String {
            self.inner.download_url(key)
        }
    }

    fn flaky(failures: u32, error: StorageError) -> Flaky {
        Flaky {
            inner: InMemoryDocumentStore::default(),
            failures_left: AtomicU32::new(failures),
            error,
        }
    }

    fn upload() -> DocumentUpload {
        DocumentUpload::new("tech.pdf", "application/pdf", b"technical".to_vec())
    }

    #[test]
    fn transient_failures_are_retried_within_budget() {
        let store = flaky(2, StorageError::Timeout("slow".to_string()));
        let policy = RetryPolicy::immediate(3);
        let mut batch = UploadBatch::new(&store, &policy, "owner");
        batch
            .upload(DocumentKind::Technical, &upload())
            .expect("third attempt succeeds");
        let stored = batch.commit();
        assert_eq!(stored.len(), 1);
        assert_eq!(store.inner.len(), 1);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let store = flaky(1, StorageError::Rejected("quota".to_string()));
        let policy = RetryPolicy::immediate(5);
        let mut batch = UploadBatch::new(&store, &policy, "owner");
        let err = batch
            .upload(DocumentKind::Technical, &upload())
            .expect_err("rejection surfaces");
        assert_eq!(err, StorageError::Rejected("quota".to_string()));
        assert_eq!(store.failures_left.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_an_uncommitted_batch_removes_its_documents() {
        let store = InMemoryDocumentStore::default();
        let policy = RetryPolicy::immediate(1);
        {
            let mut batch = UploadBatch::new(&store, &policy, "owner");
            batch
                .upload(DocumentKind::Technical, &upload())
                .expect("stored");
            batch
                .upload(DocumentKind::Emd, &upload())
                .expect("stored");
            assert_eq!(store.len(), 2);
        }
        assert!(store.is_empty());
    }

    #[test]
    fn references_capture_size_and_digest() {
        let store = InMemoryDocumentStore::default();
        let policy = RetryPolicy::default();
        let mut batch = UploadBatch::new(&store, &policy, "owner");
        let reference = batch
            .upload(DocumentKind::Financial, &upload())
            .expect("stored");
        assert_eq!(reference.size, 9);
        assert_eq!(reference.sha256, upload().digest());
        assert_eq!(reference.kind, DocumentKind::Financial);
        batch.commit();
        assert!(store.contains(&reference.storage_key));
    }
}
