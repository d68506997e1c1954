use metrics_exporter_prometheus::PrometheusHandle;
use procurement::config::{AppConfig, StorageConfig};
use procurement::workflows::carnival::{CarnivalService, InMemoryCarnivalRepository};
use procurement::workflows::documents::{
    DocumentStore, DocumentUpload, InMemoryDocumentStore, LocalDocumentStore, StorageError,
};
use procurement::workflows::tender::{InMemoryTenderRepository, TenderService};
use procurement::workflows::Clock;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Document store selected at startup from `DOCUMENT_STORAGE_ROOT`.
#[derive(Debug)]
pub(crate) enum DocumentBackend {
    Local(LocalDocumentStore),
    Memory(InMemoryDocumentStore),
}

impl DocumentBackend {
    pub(crate) fn from_config(config: &StorageConfig) -> Self {
        match &config.root {
            Some(root) => Self::Local(LocalDocumentStore::new(root, config.base_url.clone())),
            None => Self::Memory(InMemoryDocumentStore::new(config.base_url.clone())),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Memory(_) => "memory",
        }
    }
}

impl DocumentStore for DocumentBackend {
    fn put(&self, key: &str, upload: &DocumentUpload) -> Result<(), StorageError> {
        match self {
            Self::Local(store) => store.put(key, upload),
            Self::Memory(store) => store.put(key, upload),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::Local(store) => store.delete(key),
            Self::Memory(store) => store.delete(key),
        }
    }

    fn download_url(&self, key: &str) -> String {
        match self {
            Self::Local(store) => store.download_url(key),
            Self::Memory(store) => store.download_url(key),
        }
    }
}

pub(crate) type Tenders = TenderService<InMemoryTenderRepository, DocumentBackend>;
pub(crate) type Carnivals = CarnivalService<InMemoryCarnivalRepository, DocumentBackend>;

/// Both engines wired against one document store and clock.
pub(crate) struct Engines {
    pub(crate) tenders: Arc<Tenders>,
    pub(crate) carnival: Arc<Carnivals>,
}

pub(crate) fn build_engines(
    config: &AppConfig,
    documents: Arc<DocumentBackend>,
    clock: Arc<dyn Clock>,
) -> Engines {
    let retry = config.storage.retry_policy();
    let tenders = TenderService::new(
        Arc::new(InMemoryTenderRepository::default()),
        documents.clone(),
        clock.clone(),
    )
    .with_evaluation_policy(config.bidding.evaluation_policy())
    .with_retry_policy(retry.clone());
    let carnival = CarnivalService::new(
        Arc::new(InMemoryCarnivalRepository::default()),
        documents,
        clock,
    )
    .with_retry_policy(retry)
    .with_capacity_policy(config.bidding.carnival_capacity);

    Engines {
        tenders: Arc::new(tenders),
        carnival: Arc::new(carnival),
    }
}
