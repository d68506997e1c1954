use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::comparison::ComparisonOrder;
use super::domain::{Award, AwardId, BidId, BidSubmission, Tender, TenderDraft, TenderId};
use super::repository::{AwardSettlement, BidStatusView, TenderRepository};
use super::service::TenderService;
use crate::workflows::documents::{DocumentKind, DocumentStore};
use crate::workflows::error::BiddingError;
use crate::workflows::http::{decode_optional, respond, with_caller, DocumentPayload};

type SharedService<R, D> = Arc<TenderService<R, D>>;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitBidRequest {
    pub tender_id: TenderId,
    pub supplier_id: String,
    #[serde(default)]
    pub technical_document: Option<DocumentPayload>,
    #[serde(default)]
    pub financial_document: Option<DocumentPayload>,
    #[serde(default)]
    pub emd_document: Option<DocumentPayload>,
    pub amount: u64,
    #[serde(default)]
    pub warranty: String,
}

impl SubmitBidRequest {
    fn into_submission(self) -> Result<BidSubmission, BiddingError> {
        Ok(BidSubmission {
            tender_id: self.tender_id,
            supplier_id: self.supplier_id,
            technical_document: decode_optional(
                self.technical_document,
                DocumentKind::Technical,
            )?,
            financial_document: decode_optional(
                self.financial_document,
                DocumentKind::Financial,
            )?,
            emd_document: decode_optional(self.emd_document, DocumentKind::Emd)?,
            amount: self.amount,
            warranty: self.warranty,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BidStatusQuery {
    pub tender_id: TenderId,
    pub supplier_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    pub score: u8,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComparisonQuery {
    #[serde(default)]
    pub order: ComparisonOrder,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwardRequest {
    pub winning_bid_id: BidId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeAwardRequest {
    pub letter_of_intent: DocumentPayload,
    pub contract: DocumentPayload,
}

/// Authoritative post-state of an award, with bids rendered through their sanitized view.
#[derive(Debug, Clone, Serialize)]
pub struct AwardResponse {
    pub award: Award,
    pub tender: Tender,
    pub bids: Vec<BidStatusView>,
}

impl AwardResponse {
    fn from_settlement<D: DocumentStore + ?Sized>(
        settlement: AwardSettlement,
        documents: &D,
    ) -> Self {
        Self {
            bids: settlement
                .bids
                .iter()
                .map(|bid| bid.status_view(documents))
                .collect(),
            award: settlement.award,
            tender: settlement.tender,
        }
    }
}

/// Router exposing tender lifecycle, bid intake, evaluation, comparison and award endpoints.
pub fn tender_router<R, D>(service: SharedService<R, D>) -> Router
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    Router::new()
        .route("/api/v1/tenders", post(create_tender_handler::<R, D>))
        .route(
            "/api/v1/tenders/:tender_id",
            get(get_tender_handler::<R, D>).put(update_tender_handler::<R, D>),
        )
        .route(
            "/api/v1/tenders/:tender_id/publish",
            post(publish_tender_handler::<R, D>),
        )
        .route(
            "/api/v1/tenders/:tender_id/close",
            post(close_tender_handler::<R, D>),
        )
        .route(
            "/api/v1/tenders/:tender_id/withdraw",
            post(withdraw_bid_handler::<R, D>),
        )
        .route(
            "/api/v1/tenders/:tender_id/comparison",
            get(comparison_handler::<R, D>),
        )
        .route(
            "/api/v1/tenders/:tender_id/comparison.csv",
            get(comparison_csv_handler::<R, D>),
        )
        .route(
            "/api/v1/tenders/:tender_id/award",
            post(award_handler::<R, D>),
        )
        .route("/api/v1/bids", post(submit_bid_handler::<R, D>))
        .route("/api/v1/bids/status", get(bid_status_handler::<R, D>))
        .route("/api/v1/bids/:bid_id/score", post(score_handler::<R, D>))
        .route("/api/v1/awards/:award_id", get(get_award_handler::<R, D>))
        .route(
            "/api/v1/awards/:award_id/finalize",
            put(finalize_award_handler::<R, D>),
        )
        .with_state(service)
}

pub(crate) async fn create_tender_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Json(draft): Json<TenderDraft>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = with_caller(&headers, move |caller| {
        service.create_tender(&caller, draft)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn get_tender_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(tender_id): Path<String>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = TenderId(tender_id);
    let result = with_caller(&headers, move |_caller| service.get_tender(&id)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn update_tender_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(tender_id): Path<String>,
    Json(draft): Json<TenderDraft>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = TenderId(tender_id);
    let result = with_caller(&headers, move |caller| {
        service.update_tender(&caller, &id, draft)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn publish_tender_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(tender_id): Path<String>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = TenderId(tender_id);
    let result = with_caller(&headers, move |caller| service.publish_tender(&caller, &id)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn close_tender_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(tender_id): Path<String>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = TenderId(tender_id);
    let result = with_caller(&headers, move |caller| service.close_tender(&caller, &id)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn submit_bid_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Json(request): Json<SubmitBidRequest>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = with_caller(&headers, move |caller| {
        let record = service.submit_bid(&caller, request.into_submission()?)?;
        Ok(record.status_view(service.documents()))
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn bid_status_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Query(query): Query<BidStatusQuery>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = with_caller(&headers, move |caller| {
        let record = service.bid_status(&caller, &query.tender_id, &query.supplier_id)?;
        let view = record.map(|record| record.status_view(service.documents()));
        Ok(json!({ "bid": view }))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn withdraw_bid_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(tender_id): Path<String>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = TenderId(tender_id);
    let result = with_caller(&headers, move |caller| {
        let removed = service.withdraw_bid(&caller, &id)?;
        Ok(json!({ "bid_id": removed.id, "withdrawn": true }))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn score_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(bid_id): Path<String>,
    Json(request): Json<ScoreRequest>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = BidId(bid_id);
    let result = with_caller(&headers, move |caller| {
        let record = service.submit_score(&caller, &id, request.score, request.remarks)?;
        Ok(record.status_view(service.documents()))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn comparison_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(tender_id): Path<String>,
    Query(query): Query<ComparisonQuery>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = TenderId(tender_id);
    let result = with_caller(&headers, move |caller| {
        service.comparison(&caller, &id, query.order)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn comparison_csv_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(tender_id): Path<String>,
    Query(query): Query<ComparisonQuery>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = TenderId(tender_id);
    let result = with_caller(&headers, move |caller| {
        service.comparison_csv(&caller, &id, query.order)
    })
    .await;
    match result {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn award_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(tender_id): Path<String>,
    Json(request): Json<AwardRequest>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = TenderId(tender_id);
    let result = with_caller(&headers, move |caller| {
        let settlement = service.award_winner(&caller, &id, &request.winning_bid_id)?;
        Ok(AwardResponse::from_settlement(settlement, service.documents()))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn get_award_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(award_id): Path<String>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = AwardId(award_id);
    let result = with_caller(&headers, move |caller| service.get_award(&caller, &id)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn finalize_award_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(award_id): Path<String>,
    Json(request): Json<FinalizeAwardRequest>,
) -> Response
where
    R: TenderRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = AwardId(award_id);
    let result = with_caller(&headers, move |caller| {
        let letter = request.letter_of_intent.decode(DocumentKind::LetterOfIntent)?;
        let contract = request.contract.decode(DocumentKind::Contract)?;
        service.finalize_award(&caller, &id, letter, contract)
    })
    .await;
    respond(StatusCode::OK, result)
}
