use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::entities::Priority;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::orders::{CreateOrderInput, OrderView};
use crate::AppState;

/// Read-side OMS surface.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/lines", get(get_lines))
}

/// Order actions.
pub fn actions_routes() -> Router<AppState> {
    Router::new()
        .route("/combine", post(combine))
        .route("/:id/hold", post(hold))
        .route("/:id/release-hold", post(release_hold))
        .route("/:id/priority", post(set_priority))
        .route("/:id/allocate", post(allocate))
        .route("/:id/release", post(release))
        .route("/:id/ship", post(ship))
}

#[derive(Debug, Deserialize)]
struct OrderListQuery {
    view: Option<OrderView>,
    channel_id: Option<Uuid>,
}

async fn list_orders(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_VIEW)?;
    Ok(success_response(
        state.orders.list_orders(query.view, query.channel_id).await?,
    ))
}

async fn create_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_EDIT)?;
    Ok(created_response(state.orders.create_order(payload).await?))
}

async fn get_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_VIEW)?;
    Ok(success_response(state.orders.get_order(id).await?))
}

async fn get_lines(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_VIEW)?;
    Ok(success_response(state.orders.get_lines(id).await?))
}

#[derive(Debug, Deserialize)]
struct CombineRequest {
    order_ids: Vec<Uuid>,
}

async fn combine(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CombineRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_EDIT)?;
    Ok(success_response(state.orders.combine(payload.order_ids).await?))
}

async fn hold(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_EDIT)?;
    Ok(success_response(state.orders.set_hold(id, true).await?))
}

async fn release_hold(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_EDIT)?;
    Ok(success_response(state.orders.set_hold(id, false).await?))
}

#[derive(Debug, Deserialize)]
struct PriorityRequest {
    priority: Priority,
}

async fn set_priority(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PriorityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_EDIT)?;
    Ok(success_response(
        state.orders.set_priority(id, payload.priority).await?,
    ))
}

async fn allocate(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_EDIT)?;
    let order = state.orders.allocate(id).await?;
    // Immediate mode releases straight into the picking queue.
    let order = if state.config.auto_release.period_secs().is_none() {
        state.orders.release_to_picking(order.id).await?
    } else {
        order
    };
    Ok(success_response(order))
}

async fn release(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_EDIT)?;
    Ok(success_response(state.orders.release_to_picking(id).await?))
}

async fn ship(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ORDERS_EDIT)?;
    Ok(success_response(
        state.orders.ship_order(id, Some(user.user_id)).await?,
    ))
}
