//! Tender bidding lifecycle: intake, technical evaluation, comparison and award.

pub mod award;
pub mod comparison;
pub mod domain;
pub mod evaluation;
pub(crate) mod intake;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use comparison::{BidSummary, Comparison, ComparisonOrder};
pub use domain::{
    Award, AwardDocuments, AwardId, BidId, BidRecord, BidStatus, BidSubmission,
    EvaluationRecord, FinancialDisclosure, Tender, TenderDraft, TenderId, TenderStatus,
    TenderTimeline, Weightage,
};
pub use evaluation::EvaluationPolicy;
pub use memory::InMemoryTenderRepository;
pub use repository::{AwardSettlement, BidStatusView, DownloadUrls, TenderRepository};
pub use router::tender_router;
pub use service::TenderService;
