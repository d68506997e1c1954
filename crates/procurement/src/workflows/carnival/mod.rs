//! Carnival stall bidding: events with a stall capacity and single-stage approve/reject decisions.

pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    CapacityPolicy, CarnivalBid, CarnivalBidId, CarnivalBidStatus, CarnivalBidSubmission,
    CarnivalBidView, CarnivalDecision, CarnivalEvent, CarnivalEventDraft, CarnivalEventId,
    CarnivalEventView, StallAvailability,
};
pub use memory::InMemoryCarnivalRepository;
pub use repository::{CarnivalRepository, StatusDecision};
pub use router::carnival_router;
pub use service::CarnivalService;
