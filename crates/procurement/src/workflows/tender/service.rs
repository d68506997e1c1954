use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{
    BidId, BidRecord, BidStatus, BidSubmission, Tender, TenderDraft, TenderId, TenderStatus,
};
use super::evaluation::EvaluationPolicy;
use super::intake::{validate_bid, validate_draft};
use super::repository::TenderRepository;
use crate::workflows::deadline::{ensure_open, Clock};
use crate::workflows::documents::{
    with_retry, DocumentKind, DocumentStore, RetryPolicy, UploadBatch,
};
use crate::workflows::error::{BiddingError, RepositoryError};
use crate::workflows::identity::{Caller, Role};

/// Service composing the tender store, document store, deadline gate and evaluation policy.
pub struct TenderService<R, D> {
    pub(super) repository: Arc<R>,
    pub(super) documents: Arc<D>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) policy: EvaluationPolicy,
    pub(super) retry: RetryPolicy,
}

static TENDER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static BID_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_tender_id() -> TenderId {
    let id = TENDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TenderId(format!("tnd-{id:06}"))
}

fn next_bid_id() -> BidId {
    let id = BID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BidId(format!("bid-{id:06}"))
}

impl<R, D> TenderService<R, D>
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    pub fn new(repository: Arc<R>, documents: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            documents,
            clock,
            policy: EvaluationPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_evaluation_policy(mut self, policy: EvaluationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn evaluation_policy(&self) -> EvaluationPolicy {
        self.policy
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub(super) fn tender(&self, id: &TenderId) -> Result<Tender, BiddingError> {
        self.repository
            .fetch_tender(id)?
            .ok_or(BiddingError::NotFound("tender"))
    }

    pub fn get_tender(&self, id: &TenderId) -> Result<Tender, BiddingError> {
        self.tender(id)
    }

    pub fn create_tender(
        &self,
        caller: &Caller,
        draft: TenderDraft,
    ) -> Result<Tender, BiddingError> {
        caller.require(Role::Admin)?;
        validate_draft(&draft)?;

        let now = self.clock.now();
        let tender = Tender {
            id: next_tender_id(),
            title: draft.title,
            description: draft.description,
            budget_estimate: draft.budget_estimate,
            emd_amount: draft.emd_amount,
            weightage: draft.weightage,
            timeline: draft.timeline,
            eligibility_criteria: draft.eligibility_criteria,
            status: TenderStatus::Draft,
            created_by: caller.id.clone(),
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert_tender(tender)?;
        info!(tender_id = %stored.id, "tender drafted");
        Ok(stored)
    }

    /// Edits are allowed until the tender is awarded or closed. A published tender's timeline
    /// cannot move once its submission deadline has passed.
    pub fn update_tender(
        &self,
        caller: &Caller,
        id: &TenderId,
        draft: TenderDraft,
    ) -> Result<Tender, BiddingError> {
        caller.require(Role::Admin)?;
        validate_draft(&draft)?;

        let mut tender = self.tender(id)?;
        let expected = tender.status;
        if expected.is_terminal() {
            return Err(tender_state_error(expected, "edit"));
        }
        let now = self.clock.now();
        let rescheduled = draft.timeline != tender.timeline;
        let action = if rescheduled { "reschedule" } else { "edit" };
        if rescheduled
            && expected == TenderStatus::Published
            && now >= tender.timeline.submission_deadline
        {
            return Err(tender_state_error(expected, action));
        }
        tender.apply_draft(draft, now);

        self.repository
            .update_tender(tender, expected)
            .map_err(|err| tender_cas_error(err, action))
    }

    pub fn publish_tender(&self, caller: &Caller, id: &TenderId) -> Result<Tender, BiddingError> {
        caller.require(Role::Admin)?;
        let mut tender = self.tender(id)?;
        if !tender.status.can_transition_to(TenderStatus::Published) {
            return Err(tender_state_error(
                tender.status,
                TenderStatus::Published.label(),
            ));
        }

        let now = self.clock.now();
        ensure_open(&tender, now)?;

        tender.status = TenderStatus::Published;
        tender.updated_at = now;
        let published = self
            .repository
            .update_tender(tender, TenderStatus::Draft)
            .map_err(|err| tender_cas_error(err, TenderStatus::Published.label()))?;
        info!(
            tender_id = %published.id,
            deadline = %published.timeline.submission_deadline,
            "tender published"
        );
        Ok(published)
    }

    /// Withdraw a tender without awarding it.
    pub fn close_tender(&self, caller: &Caller, id: &TenderId) -> Result<Tender, BiddingError> {
        caller.require(Role::Admin)?;
        let mut tender = self.tender(id)?;
        let expected = tender.status;
        if !expected.can_transition_to(TenderStatus::Closed) {
            return Err(tender_state_error(expected, TenderStatus::Closed.label()));
        }

        tender.status = TenderStatus::Closed;
        tender.updated_at = self.clock.now();
        let closed = self
            .repository
            .update_tender(tender, expected)
            .map_err(|err| tender_cas_error(err, TenderStatus::Closed.label()))?;
        info!(tender_id = %closed.id, "tender closed without award");
        Ok(closed)
    }

    /// Submit a bid: documents and the record land together or not at all.
    pub fn submit_bid(
        &self,
        caller: &Caller,
        submission: BidSubmission,
    ) -> Result<BidRecord, BiddingError> {
        caller.require(Role::Supplier)?;
        if caller.id != submission.supplier_id {
            return Err(BiddingError::Forbidden(
                "suppliers may only bid on their own behalf".to_string(),
            ));
        }

        let tender_id = submission.tender_id.clone();
        let supplier_id = submission.supplier_id.clone();
        let bid = validate_bid(submission)?;

        let tender = self.tender(&tender_id)?;
        match tender.status {
            TenderStatus::Published => {}
            TenderStatus::Awarded => return Err(BiddingError::AlreadyAwarded),
            other => return Err(BiddingError::TenderNotOpen(other.label())),
        }
        ensure_open(&tender, self.clock.now())?;

        if self.repository.find_bid(&tender_id, &supplier_id)?.is_some() {
            return Err(BiddingError::DuplicateBid);
        }

        let owner = format!("tenders/{tender_id}/{supplier_id}");
        let mut batch = UploadBatch::new(self.documents.as_ref(), &self.retry, owner);
        let technical = batch
            .upload(DocumentKind::Technical, &bid.technical)
            .map_err(BiddingError::UpstreamStorageFailure)?;
        let financial = batch
            .upload(DocumentKind::Financial, &bid.financial)
            .map_err(BiddingError::UpstreamStorageFailure)?;
        let emd = batch
            .upload(DocumentKind::Emd, &bid.emd)
            .map_err(BiddingError::UpstreamStorageFailure)?;

        // Uploads take time; the write itself must still be inside the window.
        let now = self.clock.now();
        ensure_open(&tender, now)?;

        let record = BidRecord::new(
            next_bid_id(),
            tender_id,
            supplier_id,
            bid.amount,
            bid.warranty,
            technical,
            financial,
            emd,
            now,
        );

        let stored = self.repository.insert_bid(record).map_err(|err| match err {
            RepositoryError::Conflict => BiddingError::DuplicateBid,
            RepositoryError::StatusMismatch { actual, .. }
                if actual == TenderStatus::Awarded.label() =>
            {
                BiddingError::AlreadyAwarded
            }
            RepositoryError::StatusMismatch { actual, .. } => BiddingError::TenderNotOpen(actual),
            RepositoryError::NotFound => BiddingError::NotFound("tender"),
            other => other.into(),
        })?;
        batch.commit();

        info!(
            bid_id = %stored.id,
            tender_id = %stored.tender_id,
            supplier_id = %stored.supplier_id,
            "bid submitted"
        );
        Ok(stored)
    }

    /// Pull back a bid while the submission window is still open.
    pub fn withdraw_bid(
        &self,
        caller: &Caller,
        tender_id: &TenderId,
    ) -> Result<BidRecord, BiddingError> {
        caller.require(Role::Supplier)?;
        let tender = self.tender(tender_id)?;
        ensure_open(&tender, self.clock.now())?;

        let bid = self
            .repository
            .find_bid(tender_id, &caller.id)?
            .ok_or(BiddingError::NotFound("bid"))?;
        let removed = self
            .repository
            .remove_bid(&bid.id, BidStatus::Submitted)
            .map_err(|err| match err {
                RepositoryError::StatusMismatch { actual, .. } => BiddingError::InvalidTransition {
                    entity: "bid",
                    from: actual,
                    to: "withdrawn",
                },
                RepositoryError::NotFound => BiddingError::NotFound("bid"),
                other => other.into(),
            })?;

        for key in removed.storage_keys() {
            if let Err(err) = with_retry(&self.retry, "delete", || self.documents.delete(&key)) {
                warn!(%key, error = %err, "failed to remove document of withdrawn bid");
            }
        }
        info!(bid_id = %removed.id, tender_id = %removed.tender_id, "bid withdrawn");
        Ok(removed)
    }

    /// Idempotent status read for the owning supplier or an admin.
    pub fn bid_status(
        &self,
        caller: &Caller,
        tender_id: &TenderId,
        supplier_id: &str,
    ) -> Result<Option<BidRecord>, BiddingError> {
        caller.require_owner_or_admin(supplier_id)?;
        Ok(self.repository.find_bid(tender_id, supplier_id)?)
    }
}

fn tender_state_error(status: TenderStatus, to: &'static str) -> BiddingError {
    if status == TenderStatus::Awarded {
        BiddingError::AlreadyAwarded
    } else {
        BiddingError::InvalidTransition {
            entity: "tender",
            from: status.label(),
            to,
        }
    }
}

fn tender_cas_error(err: RepositoryError, to: &'static str) -> BiddingError {
    match err {
        RepositoryError::StatusMismatch { actual, .. }
            if actual == TenderStatus::Awarded.label() =>
        {
            BiddingError::AlreadyAwarded
        }
        RepositoryError::StatusMismatch { actual, .. } => BiddingError::InvalidTransition {
            entity: "tender",
            from: actual,
            to,
        },
        RepositoryError::NotFound => BiddingError::NotFound("tender"),
        other => other.into(),
    }
}
