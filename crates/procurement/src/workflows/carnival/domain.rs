use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::deadline::SubmissionWindow;
use crate::workflows::documents::{DocumentRef, DocumentStore, DocumentUpload};
use crate::workflows::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CarnivalEventId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CarnivalBidId(pub String);

impl fmt::Display for CarnivalEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CarnivalBidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Admin supplied event content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarnivalEventDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_date: NaiveDate,
    pub bid_deadline: DateTime<Utc>,
    pub total_stalls: u32,
    pub base_stall_price: u64,
    #[serde(default)]
    pub extra_stall_price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarnivalEvent {
    pub id: CarnivalEventId,
    pub title: String,
    pub description: String,
    pub event_date: NaiveDate,
    pub bid_deadline: DateTime<Utc>,
    pub total_stalls: u32,
    pub base_stall_price: u64,
    pub extra_stall_price: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl CarnivalEvent {
    /// Lowest acceptable offer for `stalls` stalls: the base price covers the first one.
    pub fn minimum_amount(&self, stalls: u32) -> u64 {
        let extra = u64::from(stalls.saturating_sub(1));
        self.base_stall_price
            .saturating_add(self.extra_stall_price.saturating_mul(extra))
    }
}

/// Midnight UTC at the start of the event day.
pub(crate) fn event_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

impl SubmissionWindow for CarnivalEvent {
    fn submission_deadline(&self) -> DateTime<Utc> {
        self.bid_deadline
    }
}

/// Single-stage decision state of a stall bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarnivalBidStatus {
    Pending,
    Approved,
    Rejected,
}

impl CarnivalBidStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CarnivalBidStatus::Pending => "PENDING",
            CarnivalBidStatus::Approved => "APPROVED",
            CarnivalBidStatus::Rejected => "REJECTED",
        }
    }

    /// Decisions may be corrected between APPROVED and REJECTED; nothing returns to PENDING.
    pub const fn can_transition_to(self, next: CarnivalBidStatus) -> bool {
        matches!(
            (self, next),
            (CarnivalBidStatus::Pending, CarnivalBidStatus::Approved)
                | (CarnivalBidStatus::Pending, CarnivalBidStatus::Rejected)
                | (CarnivalBidStatus::Approved, CarnivalBidStatus::Rejected)
                | (CarnivalBidStatus::Rejected, CarnivalBidStatus::Approved)
        )
    }
}

impl fmt::Display for CarnivalBidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CarnivalBidStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(CarnivalBidStatus::Pending),
            "APPROVED" => Ok(CarnivalBidStatus::Approved),
            "REJECTED" => Ok(CarnivalBidStatus::Rejected),
            other => Err(ValidationError::UnknownValue(other.to_string())),
        }
    }
}

/// Whether approvals beyond `total_stalls` are merely reported or refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    #[default]
    Advisory,
    Enforced,
}

impl CapacityPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            CapacityPolicy::Advisory => "advisory",
            CapacityPolicy::Enforced => "enforced",
        }
    }
}

impl FromStr for CapacityPolicy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(CapacityPolicy::Advisory),
            "enforced" => Ok(CapacityPolicy::Enforced),
            other => Err(ValidationError::UnknownValue(other.to_string())),
        }
    }
}

/// Stall bid as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct CarnivalBidSubmission {
    pub event_id: CarnivalEventId,
    pub supplier_id: String,
    pub technical_document: Option<DocumentUpload>,
    pub financial_document: Option<DocumentUpload>,
    pub amount: u64,
    pub stalls_requested: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarnivalBid {
    pub id: CarnivalBidId,
    pub event_id: CarnivalEventId,
    pub supplier_id: String,
    pub amount: u64,
    pub stalls_requested: u32,
    pub technical_document: DocumentRef,
    pub financial_document: DocumentRef,
    pub status: CarnivalBidStatus,
    pub submitted_at: DateTime<Utc>,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl CarnivalBid {
    pub fn view<D: DocumentStore + ?Sized>(&self, documents: &D) -> CarnivalBidView {
        CarnivalBidView {
            download_urls: CarnivalDownloadUrls {
                technical: documents.download_url(&self.technical_document.storage_key),
                financial: documents.download_url(&self.financial_document.storage_key),
            },
            bid: self.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CarnivalDownloadUrls {
    pub technical: String,
    pub financial: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CarnivalBidView {
    #[serde(flatten)]
    pub bid: CarnivalBid,
    pub download_urls: CarnivalDownloadUrls,
}

/// Stall allocation of an event, counting approved bids only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StallAvailability {
    pub total: u32,
    pub allocated: u32,
    pub remaining: u32,
    pub over_allocated: bool,
}

impl StallAvailability {
    pub fn new(total: u32, allocated: u32) -> Self {
        Self {
            total,
            allocated,
            remaining: total.saturating_sub(allocated),
            over_allocated: allocated > total,
        }
    }
}

/// Outcome of a status update together with the event's allocation afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct CarnivalDecision {
    pub bid: CarnivalBid,
    pub availability: StallAvailability,
    pub policy: CapacityPolicy,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CarnivalEventView {
    #[serde(flatten)]
    pub event: CarnivalEvent,
    pub availability: StallAvailability,
}
