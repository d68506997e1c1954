use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    CapacityPolicy, CarnivalBid, CarnivalBidId, CarnivalBidStatus, CarnivalEvent, CarnivalEventId,
    StallAvailability,
};
use super::repository::{CarnivalRepository, StatusDecision};
use crate::workflows::error::RepositoryError;

#[derive(Debug, Default)]
struct CarnivalLedger {
    events: HashMap<CarnivalEventId, CarnivalEvent>,
    bids: HashMap<CarnivalBidId, CarnivalBid>,
    supplier_index: HashMap<(CarnivalEventId, String), CarnivalBidId>,
}

impl CarnivalLedger {
    /// Approved stalls for the event, saturating at `u32::MAX`.
    fn allocated(&self, event_id: &CarnivalEventId) -> u32 {
        let total: u64 = self
            .bids
            .values()
            .filter(|bid| &bid.event_id == event_id && bid.status == CarnivalBidStatus::Approved)
            .map(|bid| u64::from(bid.stalls_requested))
            .sum();
        u32::try_from(total).unwrap_or(u32::MAX)
    }

    fn availability(
        &self,
        event_id: &CarnivalEventId,
    ) -> Result<StallAvailability, RepositoryError> {
        let event = self.events.get(event_id).ok_or(RepositoryError::NotFound)?;
        Ok(StallAvailability::new(event.total_stalls, self.allocated(event_id)))
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryCarnivalRepository {
    ledger: Arc<Mutex<CarnivalLedger>>,
}

impl InMemoryCarnivalRepository {
    fn ledger(&self) -> Result<MutexGuard<'_, CarnivalLedger>, RepositoryError> {
        self.ledger
            .lock()
            .map_err(|_| RepositoryError::Poisoned("carnival ledger"))
    }
}

impl CarnivalRepository for InMemoryCarnivalRepository {
    fn insert_event(&self, event: CarnivalEvent) -> Result<CarnivalEvent, RepositoryError> {
        let mut ledger = self.ledger()?;
        if ledger.events.contains_key(&event.id) {
            return Err(RepositoryError::Conflict);
        }
        ledger.events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    fn fetch_event(&self, id: &CarnivalEventId) -> Result<Option<CarnivalEvent>, RepositoryError> {
        Ok(self.ledger()?.events.get(id).cloned())
    }

    fn insert_bid(&self, bid: CarnivalBid) -> Result<CarnivalBid, RepositoryError> {
        let mut ledger = self.ledger()?;
        if !ledger.events.contains_key(&bid.event_id) {
            return Err(RepositoryError::NotFound);
        }
        let key = (bid.event_id.clone(), bid.supplier_id.clone());
        if ledger.supplier_index.contains_key(&key) || ledger.bids.contains_key(&bid.id) {
            return Err(RepositoryError::Conflict);
        }
        ledger.supplier_index.insert(key, bid.id.clone());
        ledger.bids.insert(bid.id.clone(), bid.clone());
        Ok(bid)
    }

    fn fetch_bid(&self, id: &CarnivalBidId) -> Result<Option<CarnivalBid>, RepositoryError> {
        Ok(self.ledger()?.bids.get(id).cloned())
    }

    fn find_bid(
        &self,
        event_id: &CarnivalEventId,
        supplier_id: &str,
    ) -> Result<Option<CarnivalBid>, RepositoryError> {
        let ledger = self.ledger()?;
        let key = (event_id.clone(), supplier_id.to_string());
        Ok(ledger
            .supplier_index
            .get(&key)
            .and_then(|id| ledger.bids.get(id))
            .cloned())
    }

    fn bids_for_event(
        &self,
        event_id: &CarnivalEventId,
    ) -> Result<Vec<CarnivalBid>, RepositoryError> {
        let ledger = self.ledger()?;
        let mut bids: Vec<CarnivalBid> = ledger
            .bids
            .values()
            .filter(|bid| &bid.event_id == event_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(bids)
    }

    fn decide_bid(
        &self,
        id: &CarnivalBidId,
        decision: StatusDecision,
    ) -> Result<(CarnivalBid, StallAvailability), RepositoryError> {
        let mut ledger = self.ledger()?;
        let (event_id, current, stalls) = ledger
            .bids
            .get(id)
            .map(|bid| (bid.event_id.clone(), bid.status, bid.stalls_requested))
            .ok_or(RepositoryError::NotFound)?;
        if current != decision.expected {
            return Err(RepositoryError::StatusMismatch {
                entity: "carnival_bid",
                expected: decision.expected.label(),
                actual: current.label(),
            });
        }

        if decision.policy == CapacityPolicy::Enforced
            && decision.status == CarnivalBidStatus::Approved
        {
            let availability = ledger.availability(&event_id)?;
            if availability.allocated.saturating_add(stalls) > availability.total {
                return Err(RepositoryError::CapacityExhausted {
                    total: availability.total,
                });
            }
        }

        let bid = ledger.bids.get_mut(id).ok_or(RepositoryError::NotFound)?;
        bid.status = decision.status;
        bid.decided_by = Some(decision.decided_by);
        bid.decided_at = Some(decision.decided_at);
        let bid = bid.clone();

        let availability = ledger.availability(&event_id)?;
        Ok((bid, availability))
    }

    fn availability(
        &self,
        event_id: &CarnivalEventId,
    ) -> Result<StallAvailability, RepositoryError> {
        self.ledger()?.availability(event_id)
    }
}
