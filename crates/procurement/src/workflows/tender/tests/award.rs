use std::sync::{Arc, Barrier};
use std::thread;

use super::common::*;
use crate::workflows::error::BiddingError;
use crate::workflows::tender::domain::{BidRecord, BidStatus, Tender, TenderStatus};
use crate::workflows::tender::repository::TenderRepository;

struct Field {
    harness: Harness,
    tender: Tender,
    first: BidRecord,
    second: BidRecord,
    rejected: BidRecord,
}

fn qualified_field() -> Field {
    let harness = harness();
    let tender = harness.published_tender();
    let first = harness.bid(&tender, "sup-1", 480_000);
    let second = harness.bid(&tender, "sup-2", 455_000);
    let rejected = harness.bid(&tender, "sup-3", 390_000);
    harness.close_submissions();
    let first = harness.score(&first, 82);
    let second = harness.score(&second, 75);
    let rejected = harness.score(&rejected, 35);
    Field {
        harness,
        tender,
        first,
        second,
        rejected,
    }
}

fn status_of(harness: &Harness, bid: &BidRecord) -> BidStatus {
    harness
        .repository
        .fetch_bid(&bid.id)
        .expect("fetch")
        .expect("present")
        .status
}

#[test]
fn award_settles_every_bid_and_locks_the_tender() {
    let field = qualified_field();

    let settlement = field
        .harness
        .service
        .award_winner(&admin(), &field.tender.id, &field.second.id)
        .expect("awarded");

    assert_eq!(settlement.tender.status, TenderStatus::Awarded);
    assert_eq!(settlement.award.winning_bid_id, field.second.id);
    assert_eq!(settlement.award.supplier_id, "sup-2");
    assert_eq!(settlement.award.amount, 455_000);
    assert!(settlement.award.documents.is_none());

    let statuses: Vec<_> = settlement
        .bids
        .iter()
        .map(|bid| (bid.supplier_id.as_str(), bid.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("sup-1", BidStatus::Lost),
            ("sup-2", BidStatus::Won),
            ("sup-3", BidStatus::Rejected),
        ]
    );
    assert_eq!(status_of(&field.harness, &field.first), BidStatus::Lost);
    assert_eq!(
        field
            .harness
            .repository
            .award_for_tender(&field.tender.id)
            .expect("fetch")
            .map(|award| award.id),
        Some(settlement.award.id)
    );
}

#[test]
fn concurrent_awards_produce_exactly_one_winner() {
    let field = qualified_field();
    let barrier = Arc::new(Barrier::new(2));
    let contenders = [field.first.id.clone(), field.second.id.clone()];

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = contenders
            .iter()
            .map(|bid_id| {
                let service = field.harness.service.clone();
                let barrier = barrier.clone();
                let tender_id = field.tender.id.clone();
                scope.spawn(move || {
                    barrier.wait();
                    service.award_winner(&admin(), &tender_id, bid_id)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .collect()
    });

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|err| matches!(err, BiddingError::AlreadyAwarded)));

    let bids = field
        .harness
        .repository
        .bids_for_tender(&field.tender.id)
        .expect("bids");
    assert_eq!(
        bids.iter()
            .filter(|bid| bid.status == BidStatus::Won)
            .count(),
        1
    );
    assert_eq!(
        bids.iter()
            .filter(|bid| bid.status == BidStatus::Lost)
            .count(),
        1
    );
}

#[test]
fn award_is_irreversible() {
    let field = qualified_field();
    let service = &field.harness.service;
    service
        .award_winner(&admin(), &field.tender.id, &field.first.id)
        .expect("awarded");

    assert!(matches!(
        service.award_winner(&admin(), &field.tender.id, &field.second.id),
        Err(BiddingError::AlreadyAwarded)
    ));
    assert!(matches!(
        service.close_tender(&admin(), &field.tender.id),
        Err(BiddingError::AlreadyAwarded)
    ));
    assert!(matches!(
        service.submit_bid(
            &supplier("sup-9"),
            submission(&field.tender, "sup-9", 100_000)
        ),
        Err(BiddingError::AlreadyAwarded)
    ));
    assert_eq!(status_of(&field.harness, &field.first), BidStatus::Won);
}

#[test]
fn only_qualified_bids_can_win() {
    let field = qualified_field();

    let err = field
        .harness
        .service
        .award_winner(&admin(), &field.tender.id, &field.rejected.id)
        .expect_err("rejected bid cannot win");
    assert!(matches!(
        err,
        BiddingError::InvalidTransition {
            entity: "bid",
            from: "REJECTED",
            to: "WON",
        }
    ));
    assert_eq!(
        field
            .harness
            .service
            .get_tender(&field.tender.id)
            .expect("tender")
            .status,
        TenderStatus::Published
    );
}

#[test]
fn finalize_is_idempotent_for_identical_documents() {
    let field = qualified_field();
    let service = &field.harness.service;
    let award = service
        .award_winner(&admin(), &field.tender.id, &field.first.id)
        .expect("awarded")
        .award;
    let stored_before = field.harness.documents.len();

    let finalized = service
        .finalize_award(
            &admin(),
            &award.id,
            document("loi.pdf", "letter of intent"),
            document("contract.pdf", "signed contract"),
        )
        .expect("finalized");
    let again = service
        .finalize_award(
            &admin(),
            &award.id,
            document("loi-copy.pdf", "letter of intent"),
            document("contract-copy.pdf", "signed contract"),
        )
        .expect("repeat is a no-op");

    assert_eq!(finalized, again);
    assert_eq!(field.harness.documents.len(), stored_before + 2);
    let documents = again.documents.expect("attached");
    assert_eq!(documents.letter_of_intent.file_name, "loi.pdf");
    assert_eq!(documents.finalized_by, ADMIN);
}

#[test]
fn closing_documents_are_write_once() {
    let field = qualified_field();
    let service = &field.harness.service;
    let award = service
        .award_winner(&admin(), &field.tender.id, &field.first.id)
        .expect("awarded")
        .award;
    service
        .finalize_award(
            &admin(),
            &award.id,
            document("loi.pdf", "letter of intent"),
            document("contract.pdf", "signed contract"),
        )
        .expect("finalized");
    let stored = field.harness.documents.len();

    let err = service
        .finalize_award(
            &admin(),
            &award.id,
            document("loi.pdf", "letter of intent"),
            document("contract.pdf", "amended contract"),
        )
        .expect_err("different documents are refused");
    assert!(matches!(
        err,
        BiddingError::InvalidTransition {
            entity: "award",
            ..
        }
    ));
    assert_eq!(field.harness.documents.len(), stored);
}

#[test]
fn finalize_requires_an_existing_award() {
    let harness = harness();
    let missing = crate::workflows::tender::domain::AwardId("awd-missing".to_string());
    assert!(matches!(
        harness.service.finalize_award(
            &admin(),
            &missing,
            document("loi.pdf", "letter"),
            document("contract.pdf", "contract"),
        ),
        Err(BiddingError::NotFound("award"))
    ));
}

#[test]
fn awards_are_visible_to_the_winner_only() {
    let field = qualified_field();
    let service = &field.harness.service;
    let award = service
        .award_winner(&admin(), &field.tender.id, &field.first.id)
        .expect("awarded")
        .award;

    assert_eq!(
        service
            .get_award(&supplier("sup-1"), &award.id)
            .expect("winner reads")
            .id,
        award.id
    );
    assert!(matches!(
        service.get_award(&supplier("sup-2"), &award.id),
        Err(BiddingError::Forbidden(_))
    ));
}
