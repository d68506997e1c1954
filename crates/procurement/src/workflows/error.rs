use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;

use super::documents::{DocumentKind, StorageError};

/// Business-rule and infrastructure failures surfaced by the bidding engines.
#[derive(Debug, thiserror::Error)]
pub enum BiddingError {
    #[error("submission deadline passed at {deadline}")]
    DeadlinePassed { deadline: DateTime<Utc> },
    #[error("a bid from this supplier already exists")]
    DuplicateBid,
    #[error("bid has already been evaluated")]
    AlreadyEvaluated,
    #[error("tender has already been awarded")]
    AlreadyAwarded,
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },
    #[error("document storage failed: {0}")]
    UpstreamStorageFailure(#[source] StorageError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("tender is {0} and not accepting bids")]
    TenderNotOpen(&'static str),
    #[error("technical evaluation opens at {opens_at}")]
    EvaluationNotOpen { opens_at: DateTime<Utc> },
    #[error("all {total} stalls are already allocated")]
    CapacityExhausted { total: u32 },
    #[error("repository failure: {0}")]
    Repository(#[source] RepositoryError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl BiddingError {
    /// Stable machine-readable code for clients.
    pub const fn code(&self) -> &'static str {
        match self {
            BiddingError::DeadlinePassed { .. } => "deadline_passed",
            BiddingError::DuplicateBid => "duplicate_bid",
            BiddingError::AlreadyEvaluated => "already_evaluated",
            BiddingError::AlreadyAwarded => "already_awarded",
            BiddingError::InvalidTransition { .. } => "invalid_transition",
            BiddingError::UpstreamStorageFailure(_) => "upstream_storage_failure",
            BiddingError::Validation(_) => "validation_failed",
            BiddingError::NotFound(_) => "not_found",
            BiddingError::Forbidden(_) => "forbidden",
            BiddingError::TenderNotOpen(_) => "tender_not_open",
            BiddingError::EvaluationNotOpen { .. } => "evaluation_not_open",
            BiddingError::CapacityExhausted { .. } => "capacity_exhausted",
            BiddingError::Repository(_) => "repository_failure",
            BiddingError::Internal(_) => "internal",
        }
    }

    /// Only infrastructure failures are worth repeating verbatim.
    pub fn is_retryable(&self) -> bool {
        match self {
            BiddingError::UpstreamStorageFailure(err) => err.is_transient(),
            BiddingError::Repository(RepositoryError::Unavailable(_)) => true,
            _ => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BiddingError::DeadlinePassed { .. }
            | BiddingError::TenderNotOpen(_)
            | BiddingError::EvaluationNotOpen { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BiddingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BiddingError::DuplicateBid
            | BiddingError::AlreadyEvaluated
            | BiddingError::AlreadyAwarded
            | BiddingError::InvalidTransition { .. }
            | BiddingError::CapacityExhausted { .. } => StatusCode::CONFLICT,
            BiddingError::NotFound(_) => StatusCode::NOT_FOUND,
            BiddingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BiddingError::UpstreamStorageFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            BiddingError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            BiddingError::Repository(_) | BiddingError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BiddingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
            "retryable": self.is_retryable(),
        }));
        (status, body).into_response()
    }
}

/// Input rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} document is required")]
    MissingDocument(DocumentKind),
    #[error("{0} document is empty")]
    EmptyDocument(DocumentKind),
    #[error("{0} must be greater than zero")]
    NonPositive(&'static str),
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("{requested} stalls requested but the event has only {total}")]
    ExceedsStalls { requested: u32, total: u32 },
    #[error("bid amount {offered} is below the minimum of {minimum}")]
    BelowMinimumPrice { minimum: u64, offered: u64 },
    #[error("technical score {0} is outside 0..=100")]
    ScoreOutOfRange(u8),
    #[error("price ({price}) and technical ({technical}) weightage must sum to 100")]
    WeightageMismatch { price: u8, technical: u8 },
    #[error("timeline out of order: {0}")]
    TimelineOutOfOrder(&'static str),
    #[error("{0} is not a recognised value")]
    UnknownValue(String),
    #[error("{0} is not valid base64 content")]
    InvalidEncoding(DocumentKind),
}

/// Failures reported by the record stores.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("{entity} is {actual}, expected {expected}")]
    StatusMismatch {
        entity: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("capacity of {total} exhausted")]
    CapacityExhausted { total: u32 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    /// A writer panicked mid-update; the store stays unusable until restarted.
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

impl From<RepositoryError> for BiddingError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => BiddingError::NotFound("record"),
            RepositoryError::CapacityExhausted { total } => {
                BiddingError::CapacityExhausted { total }
            }
            other => BiddingError::Repository(other),
        }
    }
}
