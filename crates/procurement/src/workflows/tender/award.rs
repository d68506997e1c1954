//! Single-winner award and the follow-up attachment of closing documents.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use super::domain::{Award, AwardDocuments, AwardId, BidId, BidStatus, TenderId, TenderStatus};
use super::intake::require_document;
use super::repository::{AwardSettlement, TenderRepository};
use super::service::TenderService;
use crate::workflows::documents::{DocumentKind, DocumentStore, DocumentUpload, UploadBatch};
use crate::workflows::error::{BiddingError, RepositoryError};
use crate::workflows::identity::{Caller, Role};

static AWARD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_award_id() -> AwardId {
    let id = AWARD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AwardId(format!("awd-{id:06}"))
}

fn same_documents(
    existing: &AwardDocuments,
    letter: &DocumentUpload,
    contract: &DocumentUpload,
) -> bool {
    existing.letter_of_intent.sha256 == letter.digest()
        && existing.contract.sha256 == contract.digest()
}

fn already_finalized() -> BiddingError {
    BiddingError::InvalidTransition {
        entity: "award",
        from: "FINALIZED",
        to: "FINALIZED",
    }
}

impl<R, D> TenderService<R, D>
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    /// Award the tender to one qualified bid. Irreversible.
    ///
    /// Concurrent calls for the same tender serialise on the store's PUBLISHED→AWARDED
    /// transition; the losers see `AlreadyAwarded`.
    pub fn award_winner(
        &self,
        caller: &Caller,
        tender_id: &TenderId,
        winning_bid_id: &BidId,
    ) -> Result<AwardSettlement, BiddingError> {
        caller.require(Role::Admin)?;

        let tender = self.tender(tender_id)?;
        match tender.status {
            TenderStatus::Published => {}
            TenderStatus::Awarded => return Err(BiddingError::AlreadyAwarded),
            other => {
                return Err(BiddingError::InvalidTransition {
                    entity: "tender",
                    from: other.label(),
                    to: TenderStatus::Awarded.label(),
                })
            }
        }

        let bid = self
            .repository
            .fetch_bid(winning_bid_id)?
            .filter(|bid| &bid.tender_id == tender_id)
            .ok_or(BiddingError::NotFound("bid"))?;
        match bid.status {
            BidStatus::TechQualified => {}
            // Settled bids mean a concurrent award already committed.
            BidStatus::Won | BidStatus::Lost => return Err(BiddingError::AlreadyAwarded),
            other => {
                return Err(BiddingError::InvalidTransition {
                    entity: "bid",
                    from: other.label(),
                    to: BidStatus::Won.label(),
                })
            }
        }
        let amount = bid
            .financials()
            .map(|disclosure| disclosure.amount)
            .ok_or_else(|| {
                BiddingError::Internal("qualified bid without financials".to_string())
            })?;

        let award = Award {
            id: next_award_id(),
            tender_id: tender_id.clone(),
            winning_bid_id: winning_bid_id.clone(),
            supplier_id: bid.supplier_id.clone(),
            amount,
            awarded_by: caller.id.clone(),
            awarded_at: self.clock.now(),
            documents: None,
        };

        let settlement = self
            .repository
            .commit_award(award)
            .map_err(|err| match err {
                RepositoryError::StatusMismatch {
                    entity: "tender",
                    actual,
                    ..
                } if actual == TenderStatus::Awarded.label() => BiddingError::AlreadyAwarded,
                RepositoryError::StatusMismatch {
                    entity: "tender",
                    actual,
                    ..
                } => BiddingError::InvalidTransition {
                    entity: "tender",
                    from: actual,
                    to: TenderStatus::Awarded.label(),
                },
                RepositoryError::StatusMismatch { entity, actual, .. } => {
                    BiddingError::InvalidTransition {
                        entity,
                        from: actual,
                        to: BidStatus::Won.label(),
                    }
                }
                RepositoryError::Conflict => BiddingError::AlreadyAwarded,
                RepositoryError::NotFound => BiddingError::NotFound("bid"),
                other => other.into(),
            })?;

        let lost = settlement
            .bids
            .iter()
            .filter(|bid| bid.status == BidStatus::Lost)
            .count();
        info!(
            award_id = %settlement.award.id,
            tender_id = %settlement.tender.id,
            bid_id = %settlement.award.winning_bid_id,
            lost,
            "tender awarded"
        );
        Ok(settlement)
    }

    /// Attach the letter of intent and contract.
    ///
    /// Re-sending identical documents is a no-op; different documents are refused because
    /// closing documents are write-once.
    pub fn finalize_award(
        &self,
        caller: &Caller,
        award_id: &AwardId,
        letter_of_intent: DocumentUpload,
        contract: DocumentUpload,
    ) -> Result<Award, BiddingError> {
        caller.require(Role::Admin)?;
        let letter_of_intent =
            require_document(DocumentKind::LetterOfIntent, Some(letter_of_intent))?;
        let contract = require_document(DocumentKind::Contract, Some(contract))?;

        let award = self.award(award_id)?;
        if let Some(existing) = &award.documents {
            let identical = same_documents(existing, &letter_of_intent, &contract);
            if !identical {
                return Err(already_finalized());
            }
            debug!(award_id = %award.id, "closing documents already attached");
            return Ok(award);
        }

        let owner = format!("awards/{award_id}");
        let mut batch = UploadBatch::new(self.documents.as_ref(), &self.retry, owner);
        let letter_ref = batch
            .upload(DocumentKind::LetterOfIntent, &letter_of_intent)
            .map_err(BiddingError::UpstreamStorageFailure)?;
        let contract_ref = batch
            .upload(DocumentKind::Contract, &contract)
            .map_err(BiddingError::UpstreamStorageFailure)?;

        let documents = AwardDocuments {
            letter_of_intent: letter_ref,
            contract: contract_ref,
            finalized_by: caller.id.clone(),
            finalized_at: self.clock.now(),
        };
        match self.repository.attach_award_documents(award_id, documents) {
            Ok(finalized) => {
                batch.commit();
                info!(
                    award_id = %finalized.id,
                    tender_id = %finalized.tender_id,
                    "award finalized"
                );
                Ok(finalized)
            }
            Err(RepositoryError::Conflict) => {
                // Another finaliser won; the batch drops our copies.
                let current = self.award(award_id)?;
                let identical = current
                    .documents
                    .as_ref()
                    .is_some_and(|existing| same_documents(existing, &letter_of_intent, &contract));
                if identical {
                    Ok(current)
                } else {
                    Err(already_finalized())
                }
            }
            Err(RepositoryError::NotFound) => Err(BiddingError::NotFound("award")),
            Err(other) => Err(other.into()),
        }
    }

    fn award(&self, award_id: &AwardId) -> Result<Award, BiddingError> {
        self.repository
            .fetch_award(award_id)?
            .ok_or(BiddingError::NotFound("award"))
    }

    /// Visible to admins and the winning supplier.
    pub fn get_award(&self, caller: &Caller, award_id: &AwardId) -> Result<Award, BiddingError> {
        let award = self.award(award_id)?;
        caller.require_owner_or_admin(&award.supplier_id)?;
        Ok(award)
    }
}
