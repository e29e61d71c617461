use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::entities::inbound_shipment::ShipmentStatus;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::shipments::{CreateShipmentInput, ShipmentCostInput, ShipmentLineInput};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shipments).post(create_shipment))
        .route("/:id", get(get_shipment))
        .route("/:id/lines", get(get_lines).post(add_line))
        .route("/:id/costs", get(get_costs).post(add_cost))
        .route("/costs/:cost_id/actual", post(set_actual_cost))
        .route("/:id/status", post(transition))
        .route("/:id/run-allocation", post(run_allocation))
        .route("/:id/allocations", get(get_allocations))
        .route("/:id/finalize", post(finalize))
}

#[derive(Debug, Deserialize)]
struct ShipmentListQuery {
    status: Option<ShipmentStatus>,
}

async fn list_shipments(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<ShipmentListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_VIEW)?;
    Ok(success_response(
        state.shipments.list_shipments(query.status).await?,
    ))
}

async fn create_shipment(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateShipmentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_EDIT)?;
    Ok(created_response(
        state.shipments.create_shipment(payload).await?,
    ))
}

async fn get_shipment(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_VIEW)?;
    Ok(success_response(state.shipments.get_shipment(id).await?))
}

async fn get_lines(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_VIEW)?;
    Ok(success_response(state.shipments.get_lines(id).await?))
}

async fn add_line(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShipmentLineInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_EDIT)?;
    Ok(created_response(state.shipments.add_line(id, payload).await?))
}

async fn get_costs(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_VIEW)?;
    Ok(success_response(state.shipments.get_costs(id).await?))
}

async fn add_cost(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShipmentCostInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_EDIT)?;
    Ok(created_response(state.shipments.add_cost(id, payload).await?))
}

#[derive(Debug, Deserialize)]
struct ActualCostRequest {
    actual_cents: i64,
}

async fn set_actual_cost(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(cost_id): Path<Uuid>,
    Json(payload): Json<ActualCostRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_EDIT)?;
    Ok(success_response(
        state
            .shipments
            .set_actual_cost(cost_id, payload.actual_cents)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct TransitionRequest {
    status: ShipmentStatus,
}

async fn transition(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_EDIT)?;
    Ok(success_response(
        state.shipments.transition(id, payload.status).await?,
    ))
}

async fn run_allocation(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_EDIT)?;
    state.shipments.run_allocation(id).await?;
    Ok(success_response(state.shipments.get_allocations(id).await?))
}

async fn get_allocations(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_VIEW)?;
    Ok(success_response(state.shipments.get_allocations(id).await?))
}

async fn finalize(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::SHIPMENTS_EDIT)?;
    Ok(success_response(state.shipments.finalize(id).await?))
}
