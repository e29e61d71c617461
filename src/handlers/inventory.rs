use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::entities::inventory_balance::StockState;
use crate::errors::ServiceError;
use crate::handlers::common::{success_response, PaginatedResponse};
use crate::services::inventory::{TransactionFilter, TxnRefs, UndoToken};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/receive", post(receive))
        .route("/pick", post(pick))
        .route("/adjust", post(adjust))
        .route("/transfer", post(transfer))
        .route("/transfer/:batch_id/undo", post(undo_transfer))
        .route("/reserve", post(reserve))
        .route("/unreserve", post(unreserve))
        .route("/skus/search", get(search_skus))
        .route("/atp/:product_id", get(product_atp))
}

async fn list_transactions(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::INVENTORY_VIEW)?;
    let page = filter.page.unwrap_or(1).max(1);
    let per_page = filter.per_page.unwrap_or(50).clamp(1, 500);
    let (rows, total) = state.inventory.list_transactions(filter).await?;
    Ok(success_response(PaginatedResponse::new(
        rows, page, per_page, total,
    )))
}

#[derive(Debug, Deserialize)]
struct ReceiveRequest {
    variant_id: Uuid,
    to_location_id: Uuid,
    qty: i64,
    reference: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct TxnResponse {
    transaction_id: Uuid,
}

async fn receive(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<ReceiveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::INVENTORY_ADJUST)?;
    let refs = TxnRefs {
        reference: payload.reference,
        notes: payload.notes,
        user_id: Some(user.user_id),
        ..Default::default()
    };
    let id = state
        .inventory
        .receive(payload.variant_id, payload.to_location_id, payload.qty, refs)
        .await?;
    Ok(success_response(TxnResponse { transaction_id: id }))
}

#[derive(Debug, Deserialize)]
struct PickRequest {
    variant_id: Uuid,
    from_location_id: Uuid,
    qty: i64,
    order_line_id: Uuid,
}

async fn pick(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<PickRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PICKING_EDIT)?;
    let refs = TxnRefs {
        user_id: Some(user.user_id),
        ..Default::default()
    };
    let id = state
        .inventory
        .pick(
            payload.variant_id,
            payload.from_location_id,
            payload.qty,
            payload.order_line_id,
            refs,
        )
        .await?;
    Ok(success_response(TxnResponse { transaction_id: id }))
}

#[derive(Debug, Deserialize)]
struct AdjustRequest {
    variant_id: Uuid,
    location_id: Uuid,
    state: StockState,
    signed_qty: i64,
    reason: String,
    notes: Option<String>,
}

async fn adjust(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<AdjustRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::INVENTORY_ADJUST)?;
    let refs = TxnRefs {
        notes: payload.notes,
        user_id: Some(user.user_id),
        ..Default::default()
    };
    let id = state
        .inventory
        .adjust(
            payload.variant_id,
            payload.location_id,
            payload.state,
            payload.signed_qty,
            &payload.reason,
            refs,
        )
        .await?;
    Ok(success_response(TxnResponse { transaction_id: id }))
}

#[derive(Debug, Deserialize)]
struct TransferRequest {
    variant_id: Uuid,
    from_location_id: Uuid,
    to_location_id: Uuid,
    qty: i64,
    reference: Option<String>,
}

#[derive(Debug, Serialize)]
struct TransferResponse {
    batch_id: Uuid,
    undo_token: UndoToken,
}

async fn transfer(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<TransferRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::INVENTORY_TRANSFER)?;
    let refs = TxnRefs {
        reference: payload.reference,
        user_id: Some(user.user_id),
        ..Default::default()
    };
    let (batch_id, undo_token) = state
        .inventory
        .transfer(
            payload.variant_id,
            payload.from_location_id,
            payload.to_location_id,
            payload.qty,
            refs,
        )
        .await?;
    Ok(success_response(TransferResponse {
        batch_id,
        undo_token,
    }))
}

async fn undo_transfer(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::INVENTORY_TRANSFER)?;
    let id = state.inventory.undo_transfer(UndoToken { batch_id }).await?;
    Ok(success_response(TxnResponse { transaction_id: id }))
}

#[derive(Debug, Deserialize)]
struct ReservationRequest {
    variant_id: Uuid,
    qty: i64,
    order_line_id: Uuid,
}

async fn reserve(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<ReservationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::INVENTORY_ADJUST)?;
    let id = state
        .inventory
        .reserve(payload.variant_id, payload.qty, payload.order_line_id)
        .await?;
    Ok(success_response(TxnResponse { transaction_id: id }))
}

async fn unreserve(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<ReservationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::INVENTORY_ADJUST)?;
    let id = state
        .inventory
        .unreserve(payload.variant_id, payload.qty, payload.order_line_id)
        .await?;
    Ok(success_response(TxnResponse { transaction_id: id }))
}

#[derive(Debug, Deserialize)]
struct SkuSearchQuery {
    q: String,
    location_id: Option<Uuid>,
}

async fn search_skus(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<SkuSearchQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::INVENTORY_VIEW)?;
    let variant = state.catalog.find_variant_by_sku(&query.q).await?;
    let mut balances = state.inventory.balances_for_variant(variant.id).await?;
    if let Some(location_id) = query.location_id {
        balances.retain(|b| b.location_id == location_id);
    }
    Ok(success_response(serde_json::json!({
        "variant": variant,
        "balances": balances,
    })))
}

async fn product_atp(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::INVENTORY_VIEW)?;
    Ok(success_response(
        state.inventory.atp_for_product(product_id).await?,
    ))
}
