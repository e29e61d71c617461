use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::entities::purchase_order::PoStatus;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::purchasing::{CreatePoInput, CreateVendorInput, PoLineInput, ReorderItem};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vendors", get(list_vendors).post(create_vendor))
        .route("/vendors/:id/costs", post(set_vendor_cost))
        .route("/approval-tiers", post(create_tier))
        .route("/pos", get(list_pos).post(create_po))
        .route("/pos/:id", get(get_po))
        .route("/pos/:id/lines", get(get_po_lines).post(add_line))
        .route("/pos/:id/submit", post(submit))
        .route("/pos/:id/approve", post(approve))
        .route("/pos/:id/send", post(send))
        .route("/pos/:id/acknowledge", post(acknowledge))
        .route("/pos/:id/cancel", post(cancel))
        .route("/pos/:id/close", post(close))
        .route("/pos/:id/close-short", post(close_short))
        .route("/reorder", post(reorder))
        .route("/on-order/:variant_id", get(on_order))
}

async fn list_vendors(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_VIEW)?;
    Ok(success_response(state.purchasing.list_vendors().await?))
}

async fn create_vendor(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateVendorInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    Ok(created_response(state.purchasing.create_vendor(payload).await?))
}

#[derive(Debug, Deserialize)]
struct VendorCostRequest {
    variant_id: Uuid,
    unit_cost_cents: i64,
    #[serde(default)]
    is_preferred: bool,
}

async fn set_vendor_cost(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(vendor_id): Path<Uuid>,
    Json(payload): Json<VendorCostRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    Ok(success_response(
        state
            .purchasing
            .set_vendor_cost(
                vendor_id,
                payload.variant_id,
                payload.unit_cost_cents,
                payload.is_preferred,
            )
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct CreateTierRequest {
    name: String,
    min_amount_cents: i64,
    max_amount_cents: Option<i64>,
}

async fn create_tier(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_APPROVE)?;
    Ok(created_response(
        state
            .purchasing
            .create_approval_tier(&payload.name, payload.min_amount_cents, payload.max_amount_cents)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct PoListQuery {
    status: Option<PoStatus>,
}

async fn list_pos(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<PoListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_VIEW)?;
    Ok(success_response(state.purchasing.list_pos(query.status).await?))
}

async fn create_po(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePoInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    Ok(created_response(state.purchasing.create_po(payload).await?))
}

async fn get_po(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_VIEW)?;
    Ok(success_response(state.purchasing.get_po(id).await?))
}

async fn get_po_lines(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_VIEW)?;
    Ok(success_response(state.purchasing.get_po_lines(id).await?))
}

async fn add_line(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PoLineInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    Ok(created_response(state.purchasing.add_line(id, payload).await?))
}

async fn submit(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    Ok(success_response(
        state.purchasing.submit(id, Some(user.user_id)).await?,
    ))
}

async fn approve(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_APPROVE)?;
    Ok(success_response(
        state.purchasing.approve(id, Some(user.user_id)).await?,
    ))
}

async fn send(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    Ok(success_response(
        state.purchasing.send(id, Some(user.user_id)).await?,
    ))
}

#[derive(Debug, Deserialize, Default)]
struct AcknowledgeRequest {
    confirmed_delivery_date: Option<NaiveDate>,
}

async fn acknowledge(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<AcknowledgeRequest>>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    let confirmed = payload.and_then(|Json(p)| p.confirmed_delivery_date);
    Ok(success_response(
        state
            .purchasing
            .acknowledge(id, Some(user.user_id), confirmed)
            .await?,
    ))
}

#[derive(Debug, Deserialize, Default)]
struct CancelRequest {
    note: Option<String>,
}

async fn cancel(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CancelRequest>>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    let note = payload.and_then(|Json(p)| p.note);
    Ok(success_response(
        state.purchasing.cancel(id, Some(user.user_id), note).await?,
    ))
}

async fn close(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    Ok(success_response(
        state.purchasing.close(id, Some(user.user_id)).await?,
    ))
}

async fn close_short(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    Ok(success_response(
        state.purchasing.close_short(id, Some(user.user_id)).await?,
    ))
}

async fn reorder(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(items): Json<Vec<ReorderItem>>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_EDIT)?;
    Ok(created_response(
        state.purchasing.reorder_to_drafts(items).await?,
    ))
}

async fn on_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PURCHASING_VIEW)?;
    Ok(success_response(state.purchasing.on_order(variant_id).await?))
}
