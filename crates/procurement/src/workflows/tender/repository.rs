use serde::Serialize;

use super::domain::{
    Award, AwardDocuments, AwardId, BidId, BidRecord, BidStatus, EvaluationRecord, Tender,
    TenderId, TenderStatus,
};
use crate::workflows::documents::DocumentStore;
use crate::workflows::error::RepositoryError;

/// Post-state of a committed award, returned to the caller as the authoritative result.
#[derive(Debug, Clone)]
pub struct AwardSettlement {
    pub award: Award,
    pub tender: Tender,
    pub bids: Vec<BidRecord>,
}

/// Storage abstraction for tenders, bids and awards.
///
/// Implementations own the invariants that must hold under concurrency: the unique
/// (tender, supplier) index, write-once evaluations, and the PUBLISHED→AWARDED
/// compare-and-set that serialises awards.
pub trait TenderRepository: Send + Sync {
    fn insert_tender(&self, tender: Tender) -> Result<Tender, RepositoryError>;
    fn fetch_tender(&self, id: &TenderId) -> Result<Option<Tender>, RepositoryError>;
    /// Replace a tender only if it is still in `expected` status. A published tender's
    /// timeline is frozen once any of its bids carries an evaluation.
    fn update_tender(&self, tender: Tender, expected: TenderStatus)
        -> Result<Tender, RepositoryError>;

    /// Fails with `Conflict` when the supplier already bid on the tender and with
    /// `StatusMismatch` when the tender stopped accepting bids.
    fn insert_bid(&self, bid: BidRecord) -> Result<BidRecord, RepositoryError>;
    fn fetch_bid(&self, id: &BidId) -> Result<Option<BidRecord>, RepositoryError>;
    fn find_bid(
        &self,
        tender_id: &TenderId,
        supplier_id: &str,
    ) -> Result<Option<BidRecord>, RepositoryError>;
    /// Bids of a tender in submission order.
    fn bids_for_tender(&self, tender_id: &TenderId) -> Result<Vec<BidRecord>, RepositoryError>;
    fn remove_bid(&self, id: &BidId, expected: BidStatus) -> Result<BidRecord, RepositoryError>;

    /// Write the evaluation and move the bid to `evaluation.outcome`; only once per bid.
    fn record_evaluation(
        &self,
        id: &BidId,
        evaluation: EvaluationRecord,
    ) -> Result<BidRecord, RepositoryError>;

    /// Atomically award the tender to `award.winning_bid_id` and settle every other bid.
    fn commit_award(&self, award: Award) -> Result<AwardSettlement, RepositoryError>;
    fn fetch_award(&self, id: &AwardId) -> Result<Option<Award>, RepositoryError>;
    fn award_for_tender(&self, tender_id: &TenderId) -> Result<Option<Award>, RepositoryError>;
    /// Set the closing documents; `Conflict` when they are already present.
    fn attach_award_documents(
        &self,
        id: &AwardId,
        documents: AwardDocuments,
    ) -> Result<Award, RepositoryError>;
}

/// Sanitized representation of a bid for status polling.
#[derive(Debug, Clone, Serialize)]
pub struct BidStatusView {
    pub bid_id: BidId,
    pub tender_id: TenderId,
    pub supplier_id: String,
    pub status: BidStatus,
    pub warranty: String,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    pub download_urls: DownloadUrls,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadUrls {
    pub technical: String,
    pub emd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial: Option<String>,
}

impl BidRecord {
    /// Status view; the amount and financial link appear only once unsealed.
    pub fn status_view<D: DocumentStore + ?Sized>(&self, documents: &D) -> BidStatusView {
        let financials = self.financials();
        BidStatusView {
            bid_id: self.id.clone(),
            tender_id: self.tender_id.clone(),
            supplier_id: self.supplier_id.clone(),
            status: self.status,
            warranty: self.warranty.clone(),
            submitted_at: self.submitted_at,
            technical_score: self.technical_score(),
            remarks: self
                .evaluation
                .as_ref()
                .map(|evaluation| evaluation.remarks.clone()),
            amount: financials.as_ref().map(|disclosure| disclosure.amount),
            download_urls: DownloadUrls {
                technical: documents.download_url(&self.technical_document.storage_key),
                emd: documents.download_url(&self.emd_document.storage_key),
                financial: financials
                    .map(|disclosure| documents.download_url(&disclosure.document.storage_key)),
            },
        }
    }
}
