use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{
    event_start, CapacityPolicy, CarnivalBid, CarnivalBidId, CarnivalBidStatus,
    CarnivalBidSubmission, CarnivalDecision, CarnivalEvent, CarnivalEventDraft, CarnivalEventId,
    CarnivalEventView,
};
use super::repository::{CarnivalRepository, StatusDecision};
use crate::workflows::deadline::{ensure_open, Clock};
use crate::workflows::documents::{DocumentKind, DocumentStore, RetryPolicy, UploadBatch};
use crate::workflows::error::{BiddingError, RepositoryError, ValidationError};
use crate::workflows::identity::{Caller, Role};
use crate::workflows::tender::intake::require_document;

/// Single-stage stall bidding against carnival events.
pub struct CarnivalService<R, D> {
    repository: Arc<R>,
    documents: Arc<D>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    capacity: CapacityPolicy,
}

static EVENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CARNIVAL_BID_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_event_id() -> CarnivalEventId {
    let id = EVENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CarnivalEventId(format!("crn-{id:06}"))
}

fn next_carnival_bid_id() -> CarnivalBidId {
    let id = CARNIVAL_BID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CarnivalBidId(format!("cbd-{id:06}"))
}

fn validate_event(draft: &CarnivalEventDraft) -> Result<(), ValidationError> {
    if draft.title.trim().is_empty() {
        return Err(ValidationError::Blank("title"));
    }
    if draft.total_stalls == 0 {
        return Err(ValidationError::NonPositive("total_stalls"));
    }
    if draft.base_stall_price == 0 {
        return Err(ValidationError::NonPositive("base_stall_price"));
    }
    if draft.bid_deadline >= event_start(draft.event_date) {
        return Err(ValidationError::TimelineOutOfOrder(
            "bid deadline must fall before the event date",
        ));
    }
    Ok(())
}

impl<R, D> CarnivalService<R, D>
where
    R: CarnivalRepository + 'static,
    D: DocumentStore + 'static,
{
    pub fn new(repository: Arc<R>, documents: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            documents,
            clock,
            retry: RetryPolicy::default(),
            capacity: CapacityPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_capacity_policy(mut self, capacity: CapacityPolicy) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn capacity_policy(&self) -> CapacityPolicy {
        self.capacity
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    fn event(&self, id: &CarnivalEventId) -> Result<CarnivalEvent, BiddingError> {
        self.repository
            .fetch_event(id)?
            .ok_or(BiddingError::NotFound("carnival event"))
    }

    pub fn create_event(
        &self,
        caller: &Caller,
        draft: CarnivalEventDraft,
    ) -> Result<CarnivalEvent, BiddingError> {
        caller.require(Role::Admin)?;
        validate_event(&draft)?;

        let event = CarnivalEvent {
            id: next_event_id(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            event_date: draft.event_date,
            bid_deadline: draft.bid_deadline,
            total_stalls: draft.total_stalls,
            base_stall_price: draft.base_stall_price,
            extra_stall_price: draft.extra_stall_price,
            created_by: caller.id.clone(),
            created_at: self.clock.now(),
        };
        let stored = self.repository.insert_event(event)?;
        info!(
            event_id = %stored.id,
            stalls = stored.total_stalls,
            deadline = %stored.bid_deadline,
            "carnival event created"
        );
        Ok(stored)
    }

    pub fn get_event(&self, id: &CarnivalEventId) -> Result<CarnivalEventView, BiddingError> {
        let event = self.event(id)?;
        let availability = self.repository.availability(id)?;
        Ok(CarnivalEventView {
            event,
            availability,
        })
    }

    pub fn submit_carnival_bid(
        &self,
        caller: &Caller,
        submission: CarnivalBidSubmission,
    ) -> Result<CarnivalBid, BiddingError> {
        caller.require(Role::Supplier)?;
        if caller.id != submission.supplier_id {
            return Err(BiddingError::Forbidden(
                "suppliers may only bid on their own behalf".to_string(),
            ));
        }

        let CarnivalBidSubmission {
            event_id,
            supplier_id,
            technical_document,
            financial_document,
            amount,
            stalls_requested,
        } = submission;
        let technical_upload = require_document(DocumentKind::Technical, technical_document)?;
        let financial_upload = require_document(DocumentKind::Financial, financial_document)?;
        if stalls_requested == 0 {
            return Err(ValidationError::NonPositive("stalls_requested").into());
        }
        if amount == 0 {
            return Err(ValidationError::NonPositive("amount").into());
        }

        let event = self.event(&event_id)?;
        ensure_open(&event, self.clock.now())?;
        if stalls_requested > event.total_stalls {
            return Err(ValidationError::ExceedsStalls {
                requested: stalls_requested,
                total: event.total_stalls,
            }
            .into());
        }
        let minimum = event.minimum_amount(stalls_requested);
        if amount < minimum {
            return Err(ValidationError::BelowMinimumPrice {
                minimum,
                offered: amount,
            }
            .into());
        }

        if self.repository.find_bid(&event_id, &supplier_id)?.is_some() {
            return Err(BiddingError::DuplicateBid);
        }

        let owner = format!("carnival/{event_id}/{supplier_id}");
        let mut batch = UploadBatch::new(self.documents.as_ref(), &self.retry, owner);
        let technical = batch
            .upload(DocumentKind::Technical, &technical_upload)
            .map_err(BiddingError::UpstreamStorageFailure)?;
        let financial = batch
            .upload(DocumentKind::Financial, &financial_upload)
            .map_err(BiddingError::UpstreamStorageFailure)?;

        let now = self.clock.now();
        ensure_open(&event, now)?;

        let bid = CarnivalBid {
            id: next_carnival_bid_id(),
            event_id,
            supplier_id,
            amount,
            stalls_requested,
            technical_document: technical,
            financial_document: financial,
            status: CarnivalBidStatus::Pending,
            submitted_at: now,
            decided_by: None,
            decided_at: None,
        };
        let stored = self.repository.insert_bid(bid).map_err(|err| match err {
            RepositoryError::Conflict => BiddingError::DuplicateBid,
            RepositoryError::NotFound => BiddingError::NotFound("carnival event"),
            other => other.into(),
        })?;
        batch.commit();

        info!(
            bid_id = %stored.id,
            event_id = %stored.event_id,
            supplier_id = %stored.supplier_id,
            stalls = stored.stalls_requested,
            "carnival bid submitted"
        );
        Ok(stored)
    }

    pub fn carnival_bid_status(
        &self,
        caller: &Caller,
        event_id: &CarnivalEventId,
        supplier_id: &str,
    ) -> Result<Option<CarnivalBid>, BiddingError> {
        caller.require_owner_or_admin(supplier_id)?;
        Ok(self.repository.find_bid(event_id, supplier_id)?)
    }

    pub fn list_bids(
        &self,
        caller: &Caller,
        event_id: &CarnivalEventId,
    ) -> Result<Vec<CarnivalBid>, BiddingError> {
        caller.require(Role::Admin)?;
        self.event(event_id)?;
        Ok(self.repository.bids_for_event(event_id)?)
    }

    /// Approve or reject a stall bid. Decisions on other bids of the event stay independent.
    pub fn update_bid_status(
        &self,
        caller: &Caller,
        bid_id: &CarnivalBidId,
        status: CarnivalBidStatus,
    ) -> Result<CarnivalDecision, BiddingError> {
        caller.require(Role::Admin)?;
        let bid = self
            .repository
            .fetch_bid(bid_id)?
            .ok_or(BiddingError::NotFound("carnival bid"))?;

        if bid.status == status {
            let availability = self.repository.availability(&bid.event_id)?;
            return Ok(CarnivalDecision {
                bid,
                availability,
                policy: self.capacity,
                changed: false,
            });
        }
        if !bid.status.can_transition_to(status) {
            return Err(BiddingError::InvalidTransition {
                entity: "carnival_bid",
                from: bid.status.label(),
                to: status.label(),
            });
        }

        let decision = StatusDecision {
            status,
            expected: bid.status,
            decided_by: caller.id.clone(),
            decided_at: self.clock.now(),
            policy: self.capacity,
        };
        let (decided, availability) = self
            .repository
            .decide_bid(bid_id, decision)
            .map_err(|err| match err {
                RepositoryError::StatusMismatch { actual, .. } => BiddingError::InvalidTransition {
                    entity: "carnival_bid",
                    from: actual,
                    to: status.label(),
                },
                RepositoryError::NotFound => BiddingError::NotFound("carnival bid"),
                other => other.into(),
            })?;

        if availability.over_allocated {
            warn!(
                event_id = %decided.event_id,
                total = availability.total,
                allocated = availability.allocated,
                "carnival event stalls over-allocated"
            );
        }
        info!(
            bid_id = %decided.id,
            event_id = %decided.event_id,
            status = %decided.status,
            remaining = availability.remaining,
            "carnival bid decided"
        );
        Ok(CarnivalDecision {
            bid: decided,
            availability,
            policy: self.capacity,
            changed: true,
        })
    }
}
