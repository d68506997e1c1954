use serde::{Deserialize, Serialize};

use super::super::domain::BidStatus;
use crate::workflows::error::ValidationError;

const DEFAULT_QUALIFICATION_THRESHOLD: u8 = 50;
pub(crate) const MAX_TECHNICAL_SCORE: u8 = 100;

/// Threshold policy deciding technical qualification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationPolicy {
    qualification_threshold: u8,
}

impl EvaluationPolicy {
    pub fn new(qualification_threshold: u8) -> Self {
        Self {
            qualification_threshold: qualification_threshold.min(MAX_TECHNICAL_SCORE),
        }
    }

    pub fn qualification_threshold(&self) -> u8 {
        self.qualification_threshold
    }

    /// Scores at or above the threshold qualify.
    pub fn decide(&self, score: u8) -> Result<BidStatus, ValidationError> {
        if score > MAX_TECHNICAL_SCORE {
            return Err(ValidationError::ScoreOutOfRange(score));
        }
        Ok(if score >= self.qualification_threshold {
            BidStatus::TechQualified
        } else {
            BidStatus::Rejected
        })
    }
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_QUALIFICATION_THRESHOLD)
    }
}
