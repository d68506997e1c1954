use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::domain::{
    Award, AwardDocuments, AwardId, BidId, BidRecord, BidStatus, EvaluationRecord, Tender,
    TenderId, TenderStatus,
};
use super::repository::{AwardSettlement, TenderRepository};
use crate::workflows::error::RepositoryError;

/// Reported in place of PUBLISHED once scoring has started.
const UNDER_EVALUATION: &str = "UNDER_EVALUATION";

#[derive(Debug, Default)]
struct TenderLedger {
    tenders: HashMap<TenderId, Tender>,
    bids: HashMap<BidId, BidRecord>,
    supplier_index: HashMap<(TenderId, String), BidId>,
    awards: HashMap<AwardId, Award>,
    award_index: HashMap<TenderId, AwardId>,
}

impl TenderLedger {
    fn tender_bids(&self, tender_id: &TenderId) -> Vec<BidRecord> {
        let mut bids: Vec<BidRecord> = self
            .bids
            .values()
            .filter(|bid| &bid.tender_id == tender_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        bids
    }

    fn published_tender(&self, tender_id: &TenderId) -> Result<&Tender, RepositoryError> {
        let tender = self
            .tenders
            .get(tender_id)
            .ok_or(RepositoryError::NotFound)?;
        if tender.status != TenderStatus::Published {
            return Err(RepositoryError::StatusMismatch {
                entity: "tender",
                expected: TenderStatus::Published.label(),
                actual: tender.status.label(),
            });
        }
        Ok(tender)
    }
}

/// Mutex-guarded ledger; every write path checks and mutates under one lock so the unique
/// index and the award compare-and-set hold under concurrent callers.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTenderRepository {
    ledger: Arc<Mutex<TenderLedger>>,
}

impl InMemoryTenderRepository {
    fn ledger(&self) -> Result<MutexGuard<'_, TenderLedger>, RepositoryError> {
        self.ledger
            .lock()
            .map_err(|_| RepositoryError::Poisoned("tender ledger"))
    }
}

impl TenderRepository for InMemoryTenderRepository {
    fn insert_tender(&self, tender: Tender) -> Result<Tender, RepositoryError> {
        let mut ledger = self.ledger()?;
        if ledger.tenders.contains_key(&tender.id) {
            return Err(RepositoryError::Conflict);
        }
        ledger.tenders.insert(tender.id.clone(), tender.clone());
        Ok(tender)
    }

    fn fetch_tender(&self, id: &TenderId) -> Result<Option<Tender>, RepositoryError> {
        Ok(self.ledger()?.tenders.get(id).cloned())
    }

    fn update_tender(
        &self,
        tender: Tender,
        expected: TenderStatus,
    ) -> Result<Tender, RepositoryError> {
        let mut ledger = self.ledger()?;
        let current = ledger
            .tenders
            .get(&tender.id)
            .ok_or(RepositoryError::NotFound)?;
        if current.status != expected {
            return Err(RepositoryError::StatusMismatch {
                entity: "tender",
                expected: expected.label(),
                actual: current.status.label(),
            });
        }
        let rescheduled = current.timeline != tender.timeline;
        let evaluating = ledger
            .bids
            .values()
            .any(|bid| bid.tender_id == tender.id && bid.evaluation.is_some());
        if rescheduled && evaluating && tender.status == TenderStatus::Published {
            return Err(RepositoryError::StatusMismatch {
                entity: "tender",
                expected: expected.label(),
                actual: UNDER_EVALUATION,
            });
        }
        let current = ledger
            .tenders
            .get_mut(&tender.id)
            .ok_or(RepositoryError::NotFound)?;
        *current = tender.clone();
        Ok(tender)
    }

    fn insert_bid(&self, bid: BidRecord) -> Result<BidRecord, RepositoryError> {
        let mut ledger = self.ledger()?;
        ledger.published_tender(&bid.tender_id)?;

        let key = (bid.tender_id.clone(), bid.supplier_id.clone());
        if ledger.supplier_index.contains_key(&key) || ledger.bids.contains_key(&bid.id) {
            return Err(RepositoryError::Conflict);
        }
        ledger.supplier_index.insert(key, bid.id.clone());
        ledger.bids.insert(bid.id.clone(), bid.clone());
        Ok(bid)
    }

    fn fetch_bid(&self, id: &BidId) -> Result<Option<BidRecord>, RepositoryError> {
        Ok(self.ledger()?.bids.get(id).cloned())
    }

    fn find_bid(
        &self,
        tender_id: &TenderId,
        supplier_id: &str,
    ) -> Result<Option<BidRecord>, RepositoryError> {
        let ledger = self.ledger()?;
        let key = (tender_id.clone(), supplier_id.to_string());
        Ok(ledger
            .supplier_index
            .get(&key)
            .and_then(|id| ledger.bids.get(id))
            .cloned())
    }

    fn bids_for_tender(&self, tender_id: &TenderId) -> Result<Vec<BidRecord>, RepositoryError> {
        Ok(self.ledger()?.tender_bids(tender_id))
    }

    fn remove_bid(&self, id: &BidId, expected: BidStatus) -> Result<BidRecord, RepositoryError> {
        let mut ledger = self.ledger()?;
        let status = ledger
            .bids
            .get(id)
            .map(|bid| bid.status)
            .ok_or(RepositoryError::NotFound)?;
        if status != expected {
            return Err(RepositoryError::StatusMismatch {
                entity: "bid",
                expected: expected.label(),
                actual: status.label(),
            });
        }
        let removed = ledger.bids.remove(id).ok_or(RepositoryError::NotFound)?;
        ledger
            .supplier_index
            .remove(&(removed.tender_id.clone(), removed.supplier_id.clone()));
        Ok(removed)
    }

    fn record_evaluation(
        &self,
        id: &BidId,
        evaluation: EvaluationRecord,
    ) -> Result<BidRecord, RepositoryError> {
        let mut ledger = self.ledger()?;
        let tender_id = ledger
            .bids
            .get(id)
            .map(|bid| bid.tender_id.clone())
            .ok_or(RepositoryError::NotFound)?;
        ledger.published_tender(&tender_id)?;

        let bid = ledger.bids.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if bid.evaluation.is_some() || !bid.status.can_transition_to(evaluation.outcome) {
            return Err(RepositoryError::StatusMismatch {
                entity: "bid",
                expected: BidStatus::Submitted.label(),
                actual: bid.status.label(),
            });
        }
        bid.status = evaluation.outcome;
        bid.evaluation = Some(evaluation);
        Ok(bid.clone())
    }

    fn commit_award(&self, award: Award) -> Result<AwardSettlement, RepositoryError> {
        let mut ledger = self.ledger()?;

        // Compare-and-set point: only a PUBLISHED tender can be awarded.
        ledger.published_tender(&award.tender_id)?;

        let winner = ledger
            .bids
            .get(&award.winning_bid_id)
            .filter(|bid| bid.tender_id == award.tender_id)
            .ok_or(RepositoryError::NotFound)?;
        if winner.status != BidStatus::TechQualified {
            return Err(RepositoryError::StatusMismatch {
                entity: "bid",
                expected: BidStatus::TechQualified.label(),
                actual: winner.status.label(),
            });
        }
        if ledger.award_index.contains_key(&award.tender_id) {
            return Err(RepositoryError::Conflict);
        }

        for bid in ledger.bids.values_mut() {
            if bid.tender_id != award.tender_id || bid.status != BidStatus::TechQualified {
                continue;
            }
            bid.status = if bid.id == award.winning_bid_id {
                BidStatus::Won
            } else {
                BidStatus::Lost
            };
        }

        let tender = ledger
            .tenders
            .get_mut(&award.tender_id)
            .ok_or(RepositoryError::NotFound)?;
        tender.status = TenderStatus::Awarded;
        tender.updated_at = award.awarded_at;
        let tender = tender.clone();

        ledger
            .award_index
            .insert(award.tender_id.clone(), award.id.clone());
        ledger.awards.insert(award.id.clone(), award.clone());
        debug!(tender_id = %award.tender_id, award_id = %award.id, "award committed to ledger");

        let bids = ledger.tender_bids(&award.tender_id);
        Ok(AwardSettlement {
            award,
            tender,
            bids,
        })
    }

    fn fetch_award(&self, id: &AwardId) -> Result<Option<Award>, RepositoryError> {
        Ok(self.ledger()?.awards.get(id).cloned())
    }

    fn award_for_tender(&self, tender_id: &TenderId) -> Result<Option<Award>, RepositoryError> {
        let ledger = self.ledger()?;
        Ok(ledger
            .award_index
            .get(tender_id)
            .and_then(|id| ledger.awards.get(id))
            .cloned())
    }

    fn attach_award_documents(
        &self,
        id: &AwardId,
        documents: AwardDocuments,
    ) -> Result<Award, RepositoryError> {
        let mut ledger = self.ledger()?;
        let award = ledger.awards.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if award.documents.is_some() {
            return Err(RepositoryError::Conflict);
        }
        award.documents = Some(documents);
        Ok(award.clone())
    }
}
