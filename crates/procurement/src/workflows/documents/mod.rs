//! Opaque blob store boundary for bid and award documents.

mod batch;
mod local;
mod memory;

pub use batch::{with_retry, RetryPolicy, UploadBatch};
pub use local::LocalDocumentStore;
pub use memory::InMemoryDocumentStore;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Role a document plays in a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    Technical,
    Financial,
    Emd,
    LetterOfIntent,
    Contract,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::Technical => "technical",
            DocumentKind::Financial => "financial",
            DocumentKind::Emd => "emd",
            DocumentKind::LetterOfIntent => "letter_of_intent",
            DocumentKind::Contract => "contract",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// File content handed to the engine by the transport layer.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex SHA-256 of the content; used to recognise re-submitted documents.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

impl fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Durable reference to a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub storage_key: String,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub sha256: String,
}

/// Errors raised by a document store. Timeouts and outages are transient.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("document store timed out: {0}")]
    Timeout(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("document store rejected the request: {0}")]
    Rejected(String),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Timeout(_) | StorageError::Unavailable(_))
    }
}

/// Blob store the engines write documents to. Calls are blocking.
pub trait DocumentStore: Send + Sync {
    fn put(&self, key: &str, upload: &DocumentUpload) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
    fn download_url(&self, key: &str) -> String;
}

static UPLOAD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Keys are unique per upload so a losing duplicate submission can never clobber or delete
/// the documents of the winning one.
pub(crate) fn storage_key(owner: &str, kind: DocumentKind, file_name: &str) -> String {
    let sequence = UPLOAD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let sanitized: String = file_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');
    let file = if sanitized.is_empty() {
        "document"
    } else {
        sanitized
    };
    format!("{owner}/{sequence:08}-{}-{file}", kind.label())
}
