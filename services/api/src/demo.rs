use chrono::{Duration, Utc};
use clap::Args;
use procurement::error::AppError;
use procurement::workflows::carnival::{
    CapacityPolicy, CarnivalBidStatus, CarnivalBidSubmission, CarnivalEventDraft,
    CarnivalService, InMemoryCarnivalRepository,
};
use procurement::workflows::documents::{
    DocumentStore, DocumentUpload, InMemoryDocumentStore, RetryPolicy,
};
use procurement::workflows::tender::{
    BidSubmission, ComparisonOrder, EvaluationPolicy, InMemoryTenderRepository, TenderDraft,
    TenderService, TenderTimeline, Weightage,
};
use procurement::workflows::{Caller, Clock, ManualClock};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Technical score (0-100) a bid needs to qualify
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub(crate) qualification_threshold: u8,
    /// Refuse carnival approvals beyond the event's stall count
    #[arg(long)]
    pub(crate) enforce_capacity: bool,
    /// Print the comparison as CSV instead of a table
    #[arg(long)]
    pub(crate) csv: bool,
}

const ADMIN: &str = "adm-demo";

fn document(name: &str, body: String) -> Option<DocumentUpload> {
    Some(DocumentUpload::new(name, "application/pdf", body.into_bytes()))
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let opened_at = Utc::now();
    let clock = Arc::new(ManualClock::new(opened_at));
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let documents = Arc::new(InMemoryDocumentStore::default());
    let admin = Caller::admin(ADMIN);

    println!("Procurement bidding demo");
    println!("========================");

    let tenders = TenderService::new(
        Arc::new(InMemoryTenderRepository::default()),
        documents.clone(),
        shared_clock.clone(),
    )
    .with_evaluation_policy(EvaluationPolicy::new(args.qualification_threshold))
    .with_retry_policy(RetryPolicy::immediate(1));

    let submission_deadline = opened_at + Duration::days(7);
    let tender = tenders.create_tender(
        &admin,
        TenderDraft {
            title: "Clubhouse solar installation".to_string(),
            description: "Rooftop PV array with net metering".to_string(),
            budget_estimate: 1_200_000,
            emd_amount: 25_000,
            weightage: Weightage {
                price: 40,
                technical: 60,
            },
            timeline: TenderTimeline {
                clarification_deadline: opened_at + Duration::days(3),
                submission_deadline,
                opening_date: submission_deadline + Duration::days(1),
            },
            eligibility_criteria: vec!["MNRE empanelment".to_string()],
        },
    )?;
    let tender = tenders.publish_tender(&admin, &tender.id)?;
    println!(
        "Tender {} '{}' published, bids close {}",
        tender.id,
        tender.title,
        tender.timeline.submission_deadline.format("%Y-%m-%d %H:%M UTC")
    );

    let offers = [
        ("sup-solaris", 1_150_000_u64, 82_u8),
        ("sup-brightgrid", 1_020_000, 74),
        ("sup-sunnyside", 990_000, 41),
    ];
    let mut bids = Vec::new();
    for (supplier_id, amount, _) in offers {
        let supplier = Caller::supplier(supplier_id);
        let bid = tenders.submit_bid(
            &supplier,
            BidSubmission {
                tender_id: tender.id.clone(),
                supplier_id: supplier_id.to_string(),
                technical_document: document("technical.pdf", format!("{supplier_id} design")),
                financial_document: document("financial.pdf", format!("{supplier_id} {amount}")),
                emd_document: document("emd.pdf", format!("{supplier_id} emd")),
                amount,
                warranty: "10 years on panels".to_string(),
            },
        )?;
        println!("  {} submitted bid {} (amount sealed)", supplier_id, bid.id);
        bids.push(bid);
    }

    clock.set(submission_deadline + Duration::hours(2));
    println!("\nSubmission window closed; technical evaluation");
    for (bid, (_, _, score)) in bids.iter().zip(offers) {
        let scored = tenders.submit_score(&admin, &bid.id, score, format!("panel score {score}"))?;
        println!("  {} scored {:>3} -> {}", scored.supplier_id, score, scored.status);
    }

    println!("\nComparison of qualified bids");
    if args.csv {
        print!(
            "{}",
            tenders.comparison_csv(&admin, &tender.id, ComparisonOrder::CompositeDesc)?
        );
    } else {
        let comparison = tenders.comparison(&admin, &tender.id, ComparisonOrder::CompositeDesc)?;
        for row in &comparison.bids {
            println!(
                "  {:<16} amount {:>9}  technical {:>3}  composite {:>6.2}{}",
                row.supplier_id,
                row.amount,
                row.technical_score.unwrap_or_default(),
                row.composite_score,
                if row.is_l1 { "  (L1)" } else { "" }
            );
        }
    }

    let comparison = tenders.comparison(&admin, &tender.id, ComparisonOrder::CompositeDesc)?;
    if let Some(best) = comparison.bids.first() {
        let settlement = tenders.award_winner(&admin, &tender.id, &best.bid_id)?;
        println!(
            "\nAward {}: {} wins at {} (tender now {})",
            settlement.award.id,
            settlement.award.supplier_id,
            settlement.award.amount,
            settlement.tender.status
        );
        for bid in &settlement.bids {
            println!("  {:<16} {}", bid.supplier_id, bid.status);
        }

        let award = tenders.finalize_award(
            &admin,
            &settlement.award.id,
            DocumentUpload::new("loi.pdf", "application/pdf", b"letter of intent".to_vec()),
            DocumentUpload::new("contract.pdf", "application/pdf", b"signed contract".to_vec()),
        )?;
        if let Some(closing) = award.documents {
            println!(
                "  Closing documents stored: {} and {}",
                documents.download_url(&closing.letter_of_intent.storage_key),
                documents.download_url(&closing.contract.storage_key)
            );
        }
    } else {
        println!("\nNo bid qualified; tender stays open for a decision");
    }

    run_carnival_demo(&args, clock, shared_clock, documents)
}

fn run_carnival_demo(
    args: &DemoArgs,
    clock: Arc<ManualClock>,
    shared_clock: Arc<dyn Clock>,
    documents: Arc<InMemoryDocumentStore>,
) -> Result<(), AppError> {
    let policy = if args.enforce_capacity {
        CapacityPolicy::Enforced
    } else {
        CapacityPolicy::Advisory
    };
    let carnival = CarnivalService::new(
        Arc::new(InMemoryCarnivalRepository::default()),
        documents,
        shared_clock,
    )
    .with_retry_policy(RetryPolicy::immediate(1))
    .with_capacity_policy(policy);
    let admin = Caller::admin(ADMIN);

    let now = clock.now();
    let event = carnival.create_event(
        &admin,
        CarnivalEventDraft {
            title: "Monsoon carnival".to_string(),
            description: "Food and games stalls on the central lawn".to_string(),
            event_date: (now + Duration::days(21)).date_naive(),
            bid_deadline: now + Duration::days(10),
            total_stalls: 3,
            base_stall_price: 2_000,
            extra_stall_price: 1_500,
        },
    )?;
    println!(
        "\nCarnival event {} '{}' with {} stalls ({} capacity)",
        event.id,
        event.title,
        event.total_stalls,
        policy.label()
    );

    let requests = [("sup-chaat", 2_u32), ("sup-games", 1), ("sup-icecream", 1)];
    let mut bids = Vec::new();
    for (supplier_id, stalls) in requests {
        let amount = event.minimum_amount(stalls);
        let bid = carnival.submit_carnival_bid(
            &Caller::supplier(supplier_id),
            CarnivalBidSubmission {
                event_id: event.id.clone(),
                supplier_id: supplier_id.to_string(),
                technical_document: document("menu.pdf", format!("{supplier_id} menu")),
                financial_document: document("quote.pdf", format!("{supplier_id} {amount}")),
                amount,
                stalls_requested: stalls,
            },
        )?;
        println!(
            "  {} asked for {} stall(s) at {} -> {}",
            supplier_id, stalls, amount, bid.status
        );
        bids.push(bid);
    }

    for bid in &bids {
        match carnival.update_bid_status(&admin, &bid.id, CarnivalBidStatus::Approved) {
            Ok(decision) => println!(
                "  approved {}: {} of {} stalls allocated{}",
                decision.bid.supplier_id,
                decision.availability.allocated,
                decision.availability.total,
                if decision.availability.over_allocated {
                    " (over-allocated)"
                } else {
                    ""
                }
            ),
            Err(err) => println!("  approval of {} refused: {}", bid.supplier_id, err),
        }
    }

    Ok(())
}
