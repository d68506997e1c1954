use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::workflows::deadline::{Clock, ManualClock};
use crate::workflows::documents::{
    DocumentStore, DocumentUpload, InMemoryDocumentStore, RetryPolicy, StorageError,
};
pub(super) use crate::workflows::http::test_support::{read_body, read_json_body, request};
use crate::workflows::identity::Caller;
use crate::workflows::tender::domain::{
    BidRecord, BidSubmission, Tender, TenderDraft, TenderTimeline, Weightage,
};
use crate::workflows::tender::memory::InMemoryTenderRepository;
use crate::workflows::tender::service::TenderService;

pub(super) const ADMIN: &str = "adm-1";

pub(super) fn opened_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub(super) fn submission_deadline() -> DateTime<Utc> {
    opened_at() + Duration::days(5)
}

pub(super) fn admin() -> Caller {
    Caller::admin(ADMIN)
}

pub(super) fn supplier(id: &str) -> Caller {
    Caller::supplier(id)
}

pub(super) fn draft() -> TenderDraft {
    TenderDraft {
        title: "Street lighting retrofit".to_string(),
        description: "LED retrofit for sector 4".to_string(),
        budget_estimate: 500_000,
        emd_amount: 10_000,
        weightage: Weightage {
            price: 30,
            technical: 70,
        },
        timeline: TenderTimeline {
            clarification_deadline: opened_at() + Duration::days(2),
            submission_deadline: submission_deadline(),
            opening_date: submission_deadline() + Duration::days(1),
        },
        eligibility_criteria: vec!["ISO 9001".to_string()],
    }
}

pub(super) fn document(name: &str, body: &str) -> DocumentUpload {
    DocumentUpload::new(name, "application/pdf", body.as_bytes().to_vec())
}

pub(super) fn submission(tender: &Tender, supplier_id: &str, amount: u64) -> BidSubmission {
    BidSubmission {
        tender_id: tender.id.clone(),
        supplier_id: supplier_id.to_string(),
        technical_document: Some(document("technical.pdf", supplier_id)),
        financial_document: Some(document(
            "financial.pdf",
            &format!("{supplier_id}:{amount}"),
        )),
        emd_document: Some(document("emd.pdf", "emd receipt")),
        amount,
        warranty: "36 months onsite".to_string(),
    }
}

pub(super) struct Harness<D: DocumentStore + 'static = InMemoryDocumentStore> {
    pub(super) service: Arc<TenderService<InMemoryTenderRepository, D>>,
    pub(super) repository: Arc<InMemoryTenderRepository>,
    pub(super) documents: Arc<D>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness() -> Harness {
    harness_with(Arc::new(InMemoryDocumentStore::default()))
}

pub(super) fn harness_with<D: DocumentStore + 'static>(documents: Arc<D>) -> Harness<D> {
    let repository = Arc::new(InMemoryTenderRepository::default());
    let clock = Arc::new(ManualClock::new(opened_at()));
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let service = TenderService::new(repository.clone(), documents.clone(), shared_clock)
        .with_retry_policy(RetryPolicy::immediate(3));
    Harness {
        service: Arc::new(service),
        repository,
        documents,
        clock,
    }
}

impl<D: DocumentStore + 'static> Harness<D> {
    pub(super) fn published_tender(&self) -> Tender {
        let tender = self
            .service
            .create_tender(&admin(), draft())
            .expect("tender drafted");
        self.service
            .publish_tender(&admin(), &tender.id)
            .expect("tender published")
    }

    pub(super) fn bid(&self, tender: &Tender, supplier_id: &str, amount: u64) -> BidRecord {
        self.service
            .submit_bid(&supplier(supplier_id), submission(tender, supplier_id, amount))
            .expect("bid accepted")
    }

    pub(super) fn close_submissions(&self) {
        self.clock.set(submission_deadline() + Duration::hours(1));
    }

    pub(super) fn score(&self, bid: &BidRecord, score: u8) -> BidRecord {
        self.service
            .submit_score(&admin(), &bid.id, score, format!("scored {score}"))
            .expect("score accepted")
    }
}

/// Store double that fails selected `put` calls.
pub(super) struct FaultyStore {
    pub(super) inner: InMemoryDocumentStore,
    fail_on_put: u32,
    failures: AtomicU32,
    error: StorageError,
    puts: AtomicU32,
}

impl FaultyStore {
    /// Fail `failures` consecutive puts starting with call number `fail_on_put` (1-based).
    pub(super) fn new(fail_on_put: u32, failures: u32, error: StorageError) -> Self {
        Self {
            inner: InMemoryDocumentStore::default(),
            fail_on_put,
            failures: AtomicU32::new(failures),
            error,
            puts: AtomicU32::new(0),
        }
    }

    pub(super) fn puts(&self) -> u32 {
        self.puts.load(Ordering::SeqCst)
    }
}

impl DocumentStore for FaultyStore {
    fn put(&self, key: &str, upload: &DocumentUpload) -> Result<(), StorageError> {
        let call = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.fail_on_put && self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
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
