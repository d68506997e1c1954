use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::deadline::SubmissionWindow;
use crate::workflows::documents::{DocumentRef, DocumentUpload};
use crate::workflows::error::ValidationError;

/// Identifier wrapper for tenders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenderId(pub String);

/// Identifier wrapper for submitted bids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BidId(pub String);

/// Identifier wrapper for awards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AwardId(pub String);

impl fmt::Display for TenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AwardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a tender. AWARDED and CLOSED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenderStatus {
    Draft,
    Published,
    Awarded,
    Closed,
}

impl TenderStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TenderStatus::Draft => "DRAFT",
            TenderStatus::Published => "PUBLISHED",
            TenderStatus::Awarded => "AWARDED",
            TenderStatus::Closed => "CLOSED",
        }
    }

    pub const fn can_transition_to(self, next: TenderStatus) -> bool {
        matches!(
            (self, next),
            (TenderStatus::Draft, TenderStatus::Published)
                | (TenderStatus::Draft, TenderStatus::Closed)
                | (TenderStatus::Published, TenderStatus::Awarded)
                | (TenderStatus::Published, TenderStatus::Closed)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, TenderStatus::Awarded | TenderStatus::Closed)
    }
}

impl fmt::Display for TenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TenderStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "DRAFT" => Ok(TenderStatus::Draft),
            "PUBLISHED" => Ok(TenderStatus::Published),
            "AWARDED" => Ok(TenderStatus::Awarded),
            "CLOSED" => Ok(TenderStatus::Closed),
            other => Err(ValidationError::UnknownValue(other.to_string())),
        }
    }
}

/// Lifecycle of a bid against a tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    Submitted,
    TechQualified,
    Rejected,
    Won,
    Lost,
}

impl BidStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BidStatus::Submitted => "SUBMITTED",
            BidStatus::TechQualified => "TECH_QUALIFIED",
            BidStatus::Rejected => "REJECTED",
            BidStatus::Won => "WON",
            BidStatus::Lost => "LOST",
        }
    }

    pub const fn can_transition_to(self, next: BidStatus) -> bool {
        matches!(
            (self, next),
            (BidStatus::Submitted, BidStatus::TechQualified)
                | (BidStatus::Submitted, BidStatus::Rejected)
                | (BidStatus::TechQualified, BidStatus::Won)
                | (BidStatus::TechQualified, BidStatus::Lost)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, BidStatus::Rejected | BidStatus::Won | BidStatus::Lost)
    }

    /// Financial fields are only readable once technical qualification passed.
    pub const fn financials_unsealed(self) -> bool {
        matches!(
            self,
            BidStatus::TechQualified | BidStatus::Won | BidStatus::Lost
        )
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BidStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SUBMITTED" => Ok(BidStatus::Submitted),
            "TECH_QUALIFIED" => Ok(BidStatus::TechQualified),
            "REJECTED" => Ok(BidStatus::Rejected),
            "WON" => Ok(BidStatus::Won),
            "LOST" => Ok(BidStatus::Lost),
            other => Err(ValidationError::UnknownValue(other.to_string())),
        }
    }
}

/// Relative weight of price and technical merit, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weightage {
    pub price: u8,
    pub technical: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderTimeline {
    pub clarification_deadline: DateTime<Utc>,
    pub submission_deadline: DateTime<Utc>,
    pub opening_date: DateTime<Utc>,
}

/// Admin supplied tender content used for creation and edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub budget_estimate: u64,
    pub emd_amount: u64,
    pub weightage: Weightage,
    pub timeline: TenderTimeline,
    #[serde(default)]
    pub eligibility_criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tender {
    pub id: TenderId,
    pub title: String,
    pub description: String,
    pub budget_estimate: u64,
    pub emd_amount: u64,
    pub weightage: Weightage,
    pub timeline: TenderTimeline,
    pub eligibility_criteria: Vec<String>,
    pub status: TenderStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tender {
    pub(crate) fn apply_draft(&mut self, draft: TenderDraft, now: DateTime<Utc>) {
        self.title = draft.title;
        self.description = draft.description;
        self.budget_estimate = draft.budget_estimate;
        self.emd_amount = draft.emd_amount;
        self.weightage = draft.weightage;
        self.timeline = draft.timeline;
        self.eligibility_criteria = draft.eligibility_criteria;
        self.updated_at = now;
    }
}

impl SubmissionWindow for Tender {
    fn submission_deadline(&self) -> DateTime<Utc> {
        self.timeline.submission_deadline
    }
}

/// Supplier bid as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct BidSubmission {
    pub tender_id: TenderId,
    pub supplier_id: String,
    pub technical_document: Option<DocumentUpload>,
    pub financial_document: Option<DocumentUpload>,
    pub emd_document: Option<DocumentUpload>,
    pub amount: u64,
    pub warranty: String,
}

/// Amount and financial document, readable only through [`BidRecord::financials`].
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct SealedFinancials {
    amount: u64,
    document: DocumentRef,
}

impl fmt::Debug for SealedFinancials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealedFinancials(<sealed>)")
    }
}

/// Financial fields of a bid that has passed technical qualification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialDisclosure {
    pub amount: u64,
    pub document: DocumentRef,
}

/// Score and remarks written once by the technical evaluation gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub score: u8,
    pub remarks: String,
    pub outcome: BidStatus,
    pub evaluated_by: String,
    pub evaluated_at: DateTime<Utc>,
}

/// Stored bid. Financial data stays sealed until the bid is technically qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidRecord {
    pub id: BidId,
    pub tender_id: TenderId,
    pub supplier_id: String,
    pub status: BidStatus,
    pub warranty: String,
    pub technical_document: DocumentRef,
    pub emd_document: DocumentRef,
    pub evaluation: Option<EvaluationRecord>,
    pub submitted_at: DateTime<Utc>,
    financials: SealedFinancials,
}

impl BidRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: BidId,
        tender_id: TenderId,
        supplier_id: String,
        amount: u64,
        warranty: String,
        technical_document: DocumentRef,
        financial_document: DocumentRef,
        emd_document: DocumentRef,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tender_id,
            supplier_id,
            status: BidStatus::Submitted,
            warranty,
            technical_document,
            emd_document,
            evaluation: None,
            submitted_at,
            financials: SealedFinancials {
                amount,
                document: financial_document,
            },
        }
    }

    /// `None` while the bid is below TECH_QUALIFIED, whoever asks.
    pub fn financials(&self) -> Option<FinancialDisclosure> {
        if self.status.financials_unsealed() {
            Some(FinancialDisclosure {
                amount: self.financials.amount,
                document: self.financials.document.clone(),
            })
        } else {
            None
        }
    }

    pub fn technical_score(&self) -> Option<u8> {
        self.evaluation.as_ref().map(|evaluation| evaluation.score)
    }

    /// Every stored document, including the sealed one, for cleanup on withdrawal.
    pub(crate) fn storage_keys(&self) -> Vec<String> {
        vec![
            self.technical_document.storage_key.clone(),
            self.financials.document.storage_key.clone(),
            self.emd_document.storage_key.clone(),
        ]
    }
}

/// Closing documents attached to an award after the fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardDocuments {
    pub letter_of_intent: DocumentRef,
    pub contract: DocumentRef,
    pub finalized_by: String,
    pub finalized_at: DateTime<Utc>,
}

/// The single award of a tender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub id: AwardId,
    pub tender_id: TenderId,
    pub winning_bid_id: BidId,
    pub supplier_id: String,
    pub amount: u64,
    pub awarded_by: String,
    pub awarded_at: DateTime<Utc>,
    pub documents: Option<AwardDocuments>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::documents::DocumentKind;

    fn reference(kind: DocumentKind) -> DocumentRef {
        DocumentRef {
            kind,
            storage_key: format!("key-{kind}"),
            file_name: format!("{kind}.pdf"),
            content_type: "application/pdf".to_string(),
            size: 10,
            sha256: "00".repeat(32),
        }
    }

    fn record() -> BidRecord {
        BidRecord::new(
            BidId("bid-1".to_string()),
            TenderId("tnd-1".to_string()),
            "sup-1".to_string(),
            480_000,
            "24 months".to_string(),
            reference(DocumentKind::Technical),
            reference(DocumentKind::Financial),
            reference(DocumentKind::Emd),
            Utc::now(),
        )
    }

    #[test]
    fn financials_stay_sealed_until_qualified() {
        let mut bid = record();
        assert!(bid.financials().is_none());

        bid.status = BidStatus::Rejected;
        assert!(bid.financials().is_none());

        bid.status = BidStatus::TechQualified;
        let disclosed = bid.financials().expect("unsealed");
        assert_eq!(disclosed.amount, 480_000);
        assert_eq!(disclosed.document.kind, DocumentKind::Financial);

        bid.status = BidStatus::Lost;
        assert!(bid.financials().is_some());
    }

    #[test]
    fn debug_output_never_prints_the_amount() {
        let rendered = format!("{:?}", record());
        assert!(rendered.contains("<sealed>"));
        assert!(!rendered.contains("480000"));
    }

    #[test]
    fn status_parsing_rejects_loose_casing() {
        assert_eq!(
            "TECH_QUALIFIED".parse::<BidStatus>().expect("parses"),
            BidStatus::TechQualified
        );
        assert!("Tech_Qualified".parse::<BidStatus>().is_err());
        assert!("published".parse::<TenderStatus>().is_err());
    }

    #[test]
    fn transition_tables_are_closed() {
        assert!(TenderStatus::Draft.can_transition_to(TenderStatus::Published));
        assert!(TenderStatus::Published.can_transition_to(TenderStatus::Awarded));
        assert!(!TenderStatus::Awarded.can_transition_to(TenderStatus::Published));
        assert!(!TenderStatus::Closed.can_transition_to(TenderStatus::Published));
        assert!(!TenderStatus::Draft.can_transition_to(TenderStatus::Awarded));

        assert!(BidStatus::Submitted.can_transition_to(BidStatus::Rejected));
        assert!(!BidStatus::Submitted.can_transition_to(BidStatus::Won));
        assert!(!BidStatus::Rejected.can_transition_to(BidStatus::TechQualified));
        assert!(BidStatus::Won.is_terminal());
    }
}
