use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::workflows::carnival::domain::{
    CapacityPolicy, CarnivalBid, CarnivalBidSubmission, CarnivalEvent, CarnivalEventDraft,
};
use crate::workflows::carnival::memory::InMemoryCarnivalRepository;
use crate::workflows::carnival::service::CarnivalService;
use crate::workflows::deadline::{Clock, ManualClock};
use crate::workflows::documents::{DocumentUpload, InMemoryDocumentStore, RetryPolicy};
use crate::workflows::identity::Caller;

pub(super) const ADMIN: &str = "adm-1";

pub(super) fn opened_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub(super) fn bid_deadline() -> DateTime<Utc> {
    opened_at() + Duration::days(10)
}

pub(super) fn admin() -> Caller {
    Caller::admin(ADMIN)
}

pub(super) fn supplier(id: &str) -> Caller {
    Caller::supplier(id)
}

pub(super) fn event_draft(total_stalls: u32) -> CarnivalEventDraft {
    CarnivalEventDraft {
        title: "Spring carnival".to_string(),
        description: "Food and craft stalls".to_string(),
        event_date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
        bid_deadline: bid_deadline(),
        total_stalls,
        base_stall_price: 2_000,
        extra_stall_price: 1_500,
    }
}

fn document(name: &str, body: &str) -> DocumentUpload {
    DocumentUpload::new(name, "application/pdf", body.as_bytes().to_vec())
}

pub(super) fn stall_bid(
    event: &CarnivalEvent,
    supplier_id: &str,
    amount: u64,
    stalls: u32,
) -> CarnivalBidSubmission {
    CarnivalBidSubmission {
        event_id: event.id.clone(),
        supplier_id: supplier_id.to_string(),
        technical_document: Some(document("menu.pdf", supplier_id)),
        financial_document: Some(document("quote.pdf", &format!("{supplier_id}:{amount}"))),
        amount,
        stalls_requested: stalls,
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<CarnivalService<InMemoryCarnivalRepository, InMemoryDocumentStore>>,
    pub(super) documents: Arc<InMemoryDocumentStore>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness() -> Harness {
    harness_with(CapacityPolicy::Advisory)
}

pub(super) fn harness_with(policy: CapacityPolicy) -> Harness {
    let repository = Arc::new(InMemoryCarnivalRepository::default());
    let documents = Arc::new(InMemoryDocumentStore::default());
    let clock = Arc::new(ManualClock::new(opened_at()));
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let service = CarnivalService::new(repository, documents.clone(), shared_clock)
        .with_retry_policy(RetryPolicy::immediate(3))
        .with_capacity_policy(policy);
    Harness {
        service: Arc::new(service),
        documents,
        clock,
    }
}

impl Harness {
    pub(super) fn event(&self, total_stalls: u32) -> CarnivalEvent {
        self.service
            .create_event(&admin(), event_draft(total_stalls))
            .expect("event created")
    }

    pub(super) fn bid(&self, event: &CarnivalEvent, supplier_id: &str, stalls: u32) -> CarnivalBid {
        let amount = event.minimum_amount(stalls);
        self.service
            .submit_carnival_bid(
                &supplier(supplier_id),
                stall_bid(event, supplier_id, amount, stalls),
            )
            .expect("stall bid accepted")
    }
}
