//! Read-only comparison view over the technically qualified field of a tender.

use std::cmp::Ordering;
use std::io::Write;

use serde::{Deserialize, Serialize};

use super::domain::{BidId, BidRecord, BidStatus, Tender, TenderId, Weightage};
use super::repository::TenderRepository;
use super::service::TenderService;
use crate::workflows::documents::DocumentStore;
use crate::workflows::error::BiddingError;
use crate::workflows::identity::{Caller, Role};

/// Caller-selected ordering; the engine filters, it does not rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOrder {
    #[default]
    Submitted,
    AmountAsc,
    CompositeDesc,
}

/// One row of the comparison. Only built from unsealed bids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidSummary {
    pub bid_id: BidId,
    pub supplier_id: String,
    pub status: BidStatus,
    pub amount: u64,
    pub technical_score: Option<u8>,
    pub remarks: Option<String>,
    pub warranty: String,
    pub is_l1: bool,
    pub composite_score: f64,
    pub financial_document_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub tender_id: TenderId,
    pub order: ComparisonOrder,
    pub bids: Vec<BidSummary>,
}

/// Build summaries for every bid whose financials are disclosed.
pub fn build_comparison<D: DocumentStore + ?Sized>(
    weightage: Weightage,
    bids: &[BidRecord],
    documents: &D,
    order: ComparisonOrder,
) -> Vec<BidSummary> {
    let disclosed: Vec<_> = bids
        .iter()
        .filter_map(|bid| bid.financials().map(|financials| (bid, financials)))
        .collect();
    let lowest = disclosed
        .iter()
        .map(|(_, financials)| financials.amount)
        .min();

    let mut summaries: Vec<BidSummary> = disclosed
        .into_iter()
        .map(|(bid, financials)| {
            let technical_score = bid.technical_score();
            BidSummary {
                bid_id: bid.id.clone(),
                supplier_id: bid.supplier_id.clone(),
                status: bid.status,
                amount: financials.amount,
                technical_score,
                remarks: bid
                    .evaluation
                    .as_ref()
                    .map(|evaluation| evaluation.remarks.clone()),
                warranty: bid.warranty.clone(),
                is_l1: Some(financials.amount) == lowest,
                composite_score: composite_score(
                    weightage,
                    technical_score.unwrap_or(0),
                    financials.amount,
                    lowest.unwrap_or(financials.amount),
                ),
                financial_document_url: documents.download_url(&financials.document.storage_key),
            }
        })
        .collect();

    match order {
        ComparisonOrder::Submitted => {}
        ComparisonOrder::AmountAsc => summaries.sort_by_key(|summary| summary.amount),
        ComparisonOrder::CompositeDesc => summaries.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.amount.cmp(&b.amount))
        }),
    }
    summaries
}

/// `technical * tw/100 + (L1 / amount * 100) * pw/100`, rounded to two decimals.
pub fn composite_score(weightage: Weightage, technical: u8, amount: u64, lowest: u64) -> f64 {
    let price_score = if amount == 0 {
        0.0
    } else {
        lowest as f64 / amount as f64 * 100.0
    };
    let score = f64::from(technical) * f64::from(weightage.technical) / 100.0
        + price_score * f64::from(weightage.price) / 100.0;
    (score * 100.0).round() / 100.0
}

/// Render comparison rows as CSV with a header line.
pub fn write_csv<W: Write>(writer: W, rows: &[BidSummary]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

impl<R, D> TenderService<R, D>
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    /// Admin view of the qualified field. Side-effect free.
    pub fn comparison(
        &self,
        caller: &Caller,
        tender_id: &TenderId,
        order: ComparisonOrder,
    ) -> Result<Comparison, BiddingError> {
        caller.require(Role::Admin)?;
        let tender: Tender = self.tender(tender_id)?;
        let bids = self.repository.bids_for_tender(tender_id)?;
        Ok(Comparison {
            tender_id: tender.id,
            order,
            bids: build_comparison(tender.weightage, &bids, self.documents.as_ref(), order),
        })
    }

    pub fn comparison_csv(
        &self,
        caller: &Caller,
        tender_id: &TenderId,
        order: ComparisonOrder,
    ) -> Result<String, BiddingError> {
        let comparison = self.comparison(caller, tender_id, order)?;
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &comparison.bids)
            .map_err(|err| BiddingError::Internal(format!("csv export failed: {err}")))?;
        String::from_utf8(buffer)
            .map_err(|err| BiddingError::Internal(format!("csv export failed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVEN: Weightage = Weightage {
        price: 50,
        technical: 50,
    };

    #[test]
    fn lowest_bid_gets_full_price_score() {
        assert_eq!(composite_score(EVEN, 80, 400_000, 400_000), 90.0);
        assert_eq!(composite_score(EVEN, 90, 500_000, 400_000), 85.0);
    }

    #[test]
    fn price_only_weightage_ignores_technical_score() {
        let price_only = Weightage {
            price: 100,
            technical: 0,
        };
        assert_eq!(composite_score(price_only, 10, 300_000, 300_000), 100.0);
        assert_eq!(composite_score(price_only, 99, 600_000, 300_000), 50.0);
    }
}
