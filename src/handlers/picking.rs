use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::entities::pick_wave::PickMode;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/waves", post(generate_wave))
        .route("/waves/:id", get(get_wave))
        .route("/waves/:id/tasks", get(get_tasks))
        .route("/tasks/:id/assign", post(assign_task))
        .route("/tasks/:id", patch(confirm_pick))
}

#[derive(Debug, Deserialize)]
struct GenerateWaveRequest {
    warehouse_id: Uuid,
    #[serde(default = "default_mode")]
    mode: PickMode,
    order_ids: Option<Vec<Uuid>>,
}

fn default_mode() -> PickMode {
    PickMode::Single
}

async fn generate_wave(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<GenerateWaveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PICKING_EDIT)?;
    let (wave, tasks) = state
        .picking
        .generate_wave(
            payload.warehouse_id,
            payload.mode,
            payload.order_ids,
            Some(user.user_id),
        )
        .await?;
    Ok(created_response(serde_json::json!({
        "wave": wave,
        "tasks": tasks,
    })))
}

async fn get_wave(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PICKING_VIEW)?;
    Ok(success_response(state.picking.get_wave(id).await?))
}

async fn get_tasks(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PICKING_VIEW)?;
    Ok(success_response(state.picking.get_tasks(id).await?))
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
    assignee: Uuid,
}

async fn assign_task(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PICKING_EDIT)?;
    Ok(success_response(
        state.picking.assign_task(id, payload.assignee).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct ConfirmPickRequest {
    actual_qty: i64,
}

async fn confirm_pick(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPickRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::PICKING_EDIT)?;
    Ok(success_response(
        state
            .picking
            .confirm_pick(id, payload.actual_qty, Some(user.user_id))
            .await?,
    ))
}
