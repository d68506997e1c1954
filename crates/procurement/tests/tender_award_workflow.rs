use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use procurement::workflows::documents::{DocumentUpload, LocalDocumentStore, RetryPolicy};
use procurement::workflows::tender::{
    BidStatus, BidSubmission, ComparisonOrder, InMemoryTenderRepository, TenderDraft,
    TenderService, TenderStatus, TenderTimeline, Weightage,
};
use procurement::workflows::{BiddingError, Caller, Clock, ManualClock};

fn scratch_root(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!(
        "procurement-it-{}-{name}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&root);
    root
}

fn pdf(name: &str, body: &str) -> Option<DocumentUpload> {
    Some(DocumentUpload::new(
        name,
        "application/pdf",
        body.as_bytes().to_vec(),
    ))
}

#[test]
fn tender_runs_from_draft_to_finalized_award_on_local_storage() {
    let opened_at = Utc.with_ymd_and_hms(2026, 5, 4, 8, 30, 0).unwrap();
    let deadline = opened_at + Duration::days(4);
    let clock = Arc::new(ManualClock::new(opened_at));
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let root = scratch_root("award");
    let documents = Arc::new(LocalDocumentStore::new(&root, "https://files.example/docs"));
    let service = TenderService::new(
        Arc::new(InMemoryTenderRepository::default()),
        documents,
        shared_clock,
    )
    .with_retry_policy(RetryPolicy::immediate(2));
    let admin = Caller::admin("adm-1");

    let tender = service
        .create_tender(
            &admin,
            TenderDraft {
                title: "Water tank cleaning".to_string(),
                description: "Annual contract for six overhead tanks".to_string(),
                budget_estimate: 180_000,
                emd_amount: 3_000,
                weightage: Weightage {
                    price: 50,
                    technical: 50,
                },
                timeline: TenderTimeline {
                    clarification_deadline: opened_at + Duration::days(1),
                    submission_deadline: deadline,
                    opening_date: deadline + Duration::days(1),
                },
                eligibility_criteria: Vec::new(),
            },
        )
        .expect("tender drafted");
    let tender = service
        .publish_tender(&admin, &tender.id)
        .expect("tender published");

    let mut bids = Vec::new();
    for (supplier_id, amount) in [("sup-aqua", 170_000_u64), ("sup-clear", 150_000)] {
        let bid = service
            .submit_bid(
                &Caller::supplier(supplier_id),
                BidSubmission {
                    tender_id: tender.id.clone(),
                    supplier_id: supplier_id.to_string(),
                    technical_document: pdf("method.pdf", supplier_id),
                    financial_document: pdf("price.pdf", &amount.to_string()),
                    emd_document: pdf("emd.pdf", "paid"),
                    amount,
                    warranty: "12 months".to_string(),
                },
            )
            .expect("bid accepted");
        assert!(root.join(&bid.technical_document.storage_key).is_file());
        bids.push(bid);
    }

    clock.set(deadline + Duration::minutes(5));
    let late = service.submit_bid(
        &Caller::supplier("sup-late"),
        BidSubmission {
            tender_id: tender.id.clone(),
            supplier_id: "sup-late".to_string(),
            technical_document: pdf("method.pdf", "late"),
            financial_document: pdf("price.pdf", "1"),
            emd_document: pdf("emd.pdf", "paid"),
            amount: 1,
            warranty: String::new(),
        },
    );
    assert!(matches!(late, Err(BiddingError::DeadlinePassed { .. })));

    let qualified = service
        .submit_score(&admin, &bids[0].id, 90, "experienced crew".to_string())
        .expect("scored");
    assert_eq!(qualified.status, BidStatus::TechQualified);
    let rejected = service
        .submit_score(&admin, &bids[1].id, 20, "no safety plan".to_string())
        .expect("scored");
    assert_eq!(rejected.status, BidStatus::Rejected);
    assert!(rejected.financials().is_none());

    let comparison = service
        .comparison(&admin, &tender.id, ComparisonOrder::AmountAsc)
        .expect("comparison");
    assert_eq!(comparison.bids.len(), 1, "rejected bids stay sealed");
    assert!(comparison.bids[0].is_l1);
    assert!(comparison.bids[0]
        .financial_document_url
        .starts_with("https://files.example/docs/tenders/"));

    let settlement = service
        .award_winner(&admin, &tender.id, &bids[0].id)
        .expect("awarded");
    assert_eq!(settlement.tender.status, TenderStatus::Awarded);
    assert_eq!(settlement.award.amount, 170_000);

    let letter = DocumentUpload::new("loi.pdf", "application/pdf", b"loi".to_vec());
    let contract = DocumentUpload::new("contract.pdf", "application/pdf", b"contract".to_vec());
    let award = service
        .finalize_award(&admin, &settlement.award.id, letter, contract)
        .expect("finalized");
    let closing = award.documents.expect("closing documents recorded");
    assert!(root.join(&closing.contract.storage_key).is_file());

    let visible = service
        .get_award(&Caller::supplier("sup-aqua"), &award.id)
        .expect("winner reads its award");
    assert_eq!(visible.winning_bid_id, bids[0].id);
    assert!(matches!(
        service.get_award(&Caller::supplier("sup-clear"), &award.id),
        Err(BiddingError::Forbidden(_))
    ));

    let _ = std::fs::remove_dir_all(&root);
}
