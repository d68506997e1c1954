//! Technical evaluation gate: the single writer of evaluation records and the only path
//! that unseals a bid's financial data.

mod policy;

pub use policy::EvaluationPolicy;

use tracing::info;

use super::domain::{BidId, BidRecord, BidStatus, EvaluationRecord, TenderStatus};
use super::repository::TenderRepository;
use super::service::TenderService;
use crate::workflows::deadline::can_submit;
use crate::workflows::documents::DocumentStore;
use crate::workflows::error::{BiddingError, RepositoryError};
use crate::workflows::identity::{Caller, Role};

impl<R, D> TenderService<R, D>
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    /// Score a submitted bid exactly once; the score decides qualification.
    pub fn submit_score(
        &self,
        caller: &Caller,
        bid_id: &BidId,
        score: u8,
        remarks: String,
    ) -> Result<BidRecord, BiddingError> {
        caller.require(Role::Admin)?;
        let outcome = self.policy.decide(score)?;

        let bid = self
            .repository
            .fetch_bid(bid_id)?
            .ok_or(BiddingError::NotFound("bid"))?;
        if bid.evaluation.is_some() || bid.status != BidStatus::Submitted {
            return Err(BiddingError::AlreadyEvaluated);
        }

        let tender = self.tender(&bid.tender_id)?;
        match tender.status {
            TenderStatus::Published => {}
            TenderStatus::Awarded => return Err(BiddingError::AlreadyAwarded),
            other => {
                return Err(BiddingError::InvalidTransition {
                    entity: "tender",
                    from: other.label(),
                    to: "evaluation",
                })
            }
        }
        let now = self.clock.now();
        if can_submit(&tender, now) {
            return Err(BiddingError::EvaluationNotOpen {
                opens_at: tender.timeline.submission_deadline,
            });
        }

        let evaluation = EvaluationRecord {
            score,
            remarks,
            outcome,
            evaluated_by: caller.id.clone(),
            evaluated_at: now,
        };

        let evaluated = self
            .repository
            .record_evaluation(bid_id, evaluation)
            .map_err(|err| match err {
                RepositoryError::StatusMismatch {
                    entity: "tender",
                    actual,
                    ..
                } if actual == TenderStatus::Awarded.label() => BiddingError::AlreadyAwarded,
                RepositoryError::StatusMismatch {
                    entity: "tender",
                    actual,
                    ..
                } => BiddingError::InvalidTransition {
                    entity: "tender",
                    from: actual,
                    to: "evaluation",
                },
                RepositoryError::StatusMismatch { .. } => BiddingError::AlreadyEvaluated,
                RepositoryError::NotFound => BiddingError::NotFound("bid"),
                other => other.into(),
            })?;

        info!(
            bid_id = %evaluated.id,
            tender_id = %evaluated.tender_id,
            score,
            status = evaluated.status.label(),
            "bid technically evaluated"
        );
        Ok(evaluated)
    }
}
