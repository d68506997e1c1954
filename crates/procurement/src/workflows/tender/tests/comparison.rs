use super::common::*;
use crate::workflows::error::BiddingError;
use crate::workflows::tender::comparison::ComparisonOrder;

fn scored_field() -> (Harness, crate::workflows::tender::domain::Tender) {
    let harness = harness();
    let tender = harness.published_tender();
    let a = harness.bid(&tender, "sup-a", 500_000);
    let b = harness.bid(&tender, "sup-b", 400_000);
    let c = harness.bid(&tender, "sup-c", 450_000);
    let d = harness.bid(&tender, "sup-d", 300_000);
    harness.close_submissions();
    harness.score(&a, 90);
    harness.score(&b, 60);
    harness.score(&c, 80);
    harness.score(&d, 30);
    (harness, tender)
}

fn suppliers(rows: &[crate::workflows::tender::BidSummary]) -> Vec<&str> {
    rows.iter().map(|row| row.supplier_id.as_str()).collect()
}

#[test]
fn comparison_lists_qualified_bids_in_submission_order_by_default() {
    let (harness, tender) = scored_field();

    let comparison = harness
        .service
        .comparison(&admin(), &tender.id, ComparisonOrder::default())
        .expect("comparison");

    assert_eq!(suppliers(&comparison.bids), vec!["sup-a", "sup-b", "sup-c"]);
    assert!(comparison.bids.iter().all(|row| row.technical_score.is_some()));
}

#[test]
fn rejected_low_bid_never_becomes_l1() {
    let (harness, tender) = scored_field();

    let rows = harness
        .service
        .comparison(&admin(), &tender.id, ComparisonOrder::AmountAsc)
        .expect("comparison")
        .bids;

    assert_eq!(suppliers(&rows), vec!["sup-b", "sup-c", "sup-a"]);
    assert_eq!(rows[0].amount, 400_000);
    assert!(rows[0].is_l1);
    assert!(rows[1..].iter().all(|row| !row.is_l1));
}

#[test]
fn composite_ordering_weighs_price_against_merit() {
    let (harness, tender) = scored_field();

    let rows = harness
        .service
        .comparison(&admin(), &tender.id, ComparisonOrder::CompositeDesc)
        .expect("comparison")
        .bids;

    // 30 % price, 70 % technical.
    let scores: Vec<_> = rows
        .iter()
        .map(|row| (row.supplier_id.as_str(), row.composite_score))
        .collect();
    assert_eq!(
        scores,
        vec![("sup-a", 87.0), ("sup-c", 82.67), ("sup-b", 72.0)]
    );
}

#[test]
fn comparison_is_admin_only() {
    let (harness, tender) = scored_field();
    assert!(matches!(
        harness
            .service
            .comparison(&supplier("sup-a"), &tender.id, ComparisonOrder::Submitted),
        Err(BiddingError::Forbidden(_))
    ));
}

#[test]
fn comparison_exports_as_csv() {
    let (harness, tender) = scored_field();

    let csv = harness
        .service
        .comparison_csv(&admin(), &tender.id, ComparisonOrder::AmountAsc)
        .expect("csv export");
    let mut lines = csv.lines();

    assert_eq!(
        lines.next(),
        Some(
            "bid_id,supplier_id,status,amount,technical_score,remarks,warranty,is_l1,\
             composite_score,financial_document_url"
        )
    );
    let first = lines.next().expect("first row");
    assert!(first.contains(",sup-b,TECH_QUALIFIED,400000,60,scored 60,"));
    assert!(first.contains(",true,"));
    assert_eq!(lines.count(), 2);
}
