use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    CapacityPolicy, CarnivalBidId, CarnivalBidStatus, CarnivalBidSubmission, CarnivalBidView,
    CarnivalDecision, CarnivalEventDraft, CarnivalEventId, StallAvailability,
};
use super::repository::CarnivalRepository;
use super::service::CarnivalService;
use crate::workflows::documents::{DocumentKind, DocumentStore};
use crate::workflows::error::BiddingError;
use crate::workflows::http::{decode_optional, respond, with_caller, DocumentPayload};

type SharedService<R, D> = Arc<CarnivalService<R, D>>;

fn one_stall() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitCarnivalBidRequest {
    pub event_id: CarnivalEventId,
    pub supplier_id: String,
    #[serde(default)]
    pub technical_document: Option<DocumentPayload>,
    #[serde(default)]
    pub financial_document: Option<DocumentPayload>,
    pub amount: u64,
    #[serde(default = "one_stall")]
    pub stalls_requested: u32,
}

impl SubmitCarnivalBidRequest {
    fn into_submission(self) -> Result<CarnivalBidSubmission, BiddingError> {
        Ok(CarnivalBidSubmission {
            event_id: self.event_id,
            supplier_id: self.supplier_id,
            technical_document: decode_optional(
                self.technical_document,
                DocumentKind::Technical,
            )?,
            financial_document: decode_optional(
                self.financial_document,
                DocumentKind::Financial,
            )?,
            amount: self.amount,
            stalls_requested: self.stalls_requested,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarnivalBidStatusQuery {
    pub event_id: CarnivalEventId,
    pub supplier_id: String,
}

/// Raw status text; parsed strictly into [`CarnivalBidStatus`] by the handler.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionResponse {
    pub bid: CarnivalBidView,
    pub availability: StallAvailability,
    pub policy: CapacityPolicy,
    pub changed: bool,
}

impl DecisionResponse {
    fn from_decision<D: DocumentStore + ?Sized>(decision: CarnivalDecision, documents: &D) -> Self {
        Self {
            bid: decision.bid.view(documents),
            availability: decision.availability,
            policy: decision.policy,
            changed: decision.changed,
        }
    }
}

pub fn carnival_router<R, D>(service: SharedService<R, D>) -> Router
where
    R: CarnivalRepository + 'static,
    D: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/carnival/events",
            post(create_event_handler::<R, D>),
        )
        .route(
            "/api/v1/carnival/events/:event_id",
            get(get_event_handler::<R, D>),
        )
        .route(
            "/api/v1/carnival/events/:event_id/bids",
            get(list_bids_handler::<R, D>),
        )
        .route("/api/v1/carnival/bids", post(submit_bid_handler::<R, D>))
        .route(
            "/api/v1/carnival/bids/status",
            get(bid_status_handler::<R, D>),
        )
        .route(
            "/api/v1/carnival/bids/:bid_id/status",
            put(update_status_handler::<R, D>),
        )
        .with_state(service)
}

pub(crate) async fn create_event_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Json(draft): Json<CarnivalEventDraft>,
) -> Response
where
    R: CarnivalRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = with_caller(&headers, move |caller| {
        service.create_event(&caller, draft)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn get_event_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Response
where
    R: CarnivalRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = CarnivalEventId(event_id);
    let result = with_caller(&headers, move |_caller| service.get_event(&id)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn list_bids_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Response
where
    R: CarnivalRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = CarnivalEventId(event_id);
    let result = with_caller(&headers, move |caller| {
        let bids = service.list_bids(&caller, &id)?;
        Ok(bids
            .iter()
            .map(|bid| bid.view(service.documents()))
            .collect::<Vec<_>>())
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn submit_bid_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Json(request): Json<SubmitCarnivalBidRequest>,
) -> Response
where
    R: CarnivalRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = with_caller(&headers, move |caller| {
        let bid = service.submit_carnival_bid(&caller, request.into_submission()?)?;
        Ok(bid.view(service.documents()))
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn bid_status_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Query(query): Query<CarnivalBidStatusQuery>,
) -> Response
where
    R: CarnivalRepository + 'static,
    D: DocumentStore + 'static,
{
    let result = with_caller(&headers, move |caller| {
        let bid = service.carnival_bid_status(&caller, &query.event_id, &query.supplier_id)?;
        let view = bid.map(|bid| bid.view(service.documents()));
        Ok(json!({ "bid": view }))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn update_status_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(bid_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Response
where
    R: CarnivalRepository + 'static,
    D: DocumentStore + 'static,
{
    let id = CarnivalBidId(bid_id);
    let result = with_caller(&headers, move |caller| {
        let status = request.status.parse::<CarnivalBidStatus>()?;
        let decision = service.update_bid_status(&caller, &id, status)?;
        Ok(DecisionResponse::from_decision(decision, service.documents()))
    })
    .await;
    respond(StatusCode::OK, result)
}
