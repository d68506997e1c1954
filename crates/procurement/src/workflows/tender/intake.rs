use super::domain::{BidSubmission, TenderDraft};
use crate::workflows::documents::{DocumentKind, DocumentUpload};
use crate::workflows::error::ValidationError;

/// Submission after the intake checks: every document present and non-empty.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedBid {
    pub(crate) technical: DocumentUpload,
    pub(crate) financial: DocumentUpload,
    pub(crate) emd: DocumentUpload,
    pub(crate) amount: u64,
    pub(crate) warranty: String,
}

pub(crate) fn require_document(
    kind: DocumentKind,
    document: Option<DocumentUpload>,
) -> Result<DocumentUpload, ValidationError> {
    let document = document.ok_or(ValidationError::MissingDocument(kind))?;
    if document.is_empty() {
        return Err(ValidationError::EmptyDocument(kind));
    }
    Ok(document)
}

pub(crate) fn validate_bid(submission: BidSubmission) -> Result<ValidatedBid, ValidationError> {
    let BidSubmission {
        technical_document,
        financial_document,
        emd_document,
        amount,
        warranty,
        ..
    } = submission;

    let technical = require_document(DocumentKind::Technical, technical_document)?;
    let financial = require_document(DocumentKind::Financial, financial_document)?;
    let emd = require_document(DocumentKind::Emd, emd_document)?;
    if amount == 0 {
        return Err(ValidationError::NonPositive("amount"));
    }

    Ok(ValidatedBid {
        technical,
        financial,
        emd,
        amount,
        warranty: warranty.trim().to_string(),
    })
}

pub(crate) fn validate_draft(draft: &TenderDraft) -> Result<(), ValidationError> {
    if draft.title.trim().is_empty() {
        return Err(ValidationError::Blank("title"));
    }
    if draft.budget_estimate == 0 {
        return Err(ValidationError::NonPositive("budget_estimate"));
    }

    let weightage = draft.weightage;
    if u16::from(weightage.price) + u16::from(weightage.technical) != 100 {
        return Err(ValidationError::WeightageMismatch {
            price: weightage.price,
            technical: weightage.technical,
        });
    }

    let timeline = draft.timeline;
    if timeline.clarification_deadline > timeline.submission_deadline {
        return Err(ValidationError::TimelineOutOfOrder(
            "clarification deadline falls after the submission deadline",
        ));
    }
    if timeline.submission_deadline >= timeline.opening_date {
        return Err(ValidationError::TimelineOutOfOrder(
            "bids must close before the opening date",
        ));
    }
    Ok(())
}
