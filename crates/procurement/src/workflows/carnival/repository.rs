use chrono::{DateTime, Utc};

use super::domain::{
    CapacityPolicy, CarnivalBid, CarnivalBidId, CarnivalBidStatus, CarnivalEvent, CarnivalEventId,
    StallAvailability,
};
use crate::workflows::error::RepositoryError;

/// A status write for one stall bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDecision {
    pub status: CarnivalBidStatus,
    /// Status the caller observed; the write fails if it changed meanwhile.
    pub expected: CarnivalBidStatus,
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
    pub policy: CapacityPolicy,
}

/// Storage abstraction for carnival events and stall bids.
///
/// Implementations enforce one bid per (event, supplier) and, under
/// [`CapacityPolicy::Enforced`], check capacity atomically with the approval.
pub trait CarnivalRepository: Send + Sync {
    fn insert_event(&self, event: CarnivalEvent) -> Result<CarnivalEvent, RepositoryError>;
    fn fetch_event(&self, id: &CarnivalEventId) -> Result<Option<CarnivalEvent>, RepositoryError>;

    fn insert_bid(&self, bid: CarnivalBid) -> Result<CarnivalBid, RepositoryError>;
    fn fetch_bid(&self, id: &CarnivalBidId) -> Result<Option<CarnivalBid>, RepositoryError>;
    fn find_bid(
        &self,
        event_id: &CarnivalEventId,
        supplier_id: &str,
    ) -> Result<Option<CarnivalBid>, RepositoryError>;
    /// Bids of an event in submission order.
    fn bids_for_event(&self, event_id: &CarnivalEventId)
        -> Result<Vec<CarnivalBid>, RepositoryError>;

    fn decide_bid(
        &self,
        id: &CarnivalBidId,
        decision: StatusDecision,
    ) -> Result<(CarnivalBid, StallAvailability), RepositoryError>;
    fn availability(&self, event_id: &CarnivalEventId)
        -> Result<StallAvailability, RepositoryError>;
}
