use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::entities::receiving_order::ReceivingStatus;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::receiving::{
    CreateReceivingOrderInput, ReceivingLineInput, UpdateReceivingLineInput,
};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/from-po/:po_id", post(create_from_po))
        .route("/:id", get(get_order))
        .route("/:id/lines", get(get_lines).post(add_line))
        .route("/:id/lines/bulk", post(import_lines))
        .route("/lines/:line_id", patch(update_line))
        .route("/:id/open", post(open))
        .route("/:id/close", post(close))
}

#[derive(Debug, Deserialize)]
struct ReceivingListQuery {
    status: Option<ReceivingStatus>,
}

async fn list(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<ReceivingListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::RECEIVING_VIEW)?;
    Ok(success_response(state.receiving.list(query.status).await?))
}

async fn create(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateReceivingOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::RECEIVING_EDIT)?;
    Ok(created_response(state.receiving.create(payload).await?))
}

async fn create_from_po(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(po_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::RECEIVING_EDIT)?;
    Ok(created_response(state.receiving.create_from_po(po_id).await?))
}

async fn get_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::RECEIVING_VIEW)?;
    Ok(success_response(state.receiving.get(id).await?))
}

async fn get_lines(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::RECEIVING_VIEW)?;
    Ok(success_response(state.receiving.get_lines(id).await?))
}

async fn add_line(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceivingLineInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::RECEIVING_EDIT)?;
    Ok(created_response(state.receiving.add_line(id, payload).await?))
}

#[derive(Debug, Deserialize)]
struct BulkImportRequest {
    csv: String,
}

async fn import_lines(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BulkImportRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::RECEIVING_EDIT)?;
    Ok(success_response(
        state.receiving.import_lines_csv(id, &payload.csv).await?,
    ))
}

async fn update_line(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(line_id): Path<Uuid>,
    Json(payload): Json<UpdateReceivingLineInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::RECEIVING_EDIT)?;
    Ok(success_response(
        state.receiving.update_line(line_id, payload).await?,
    ))
}

async fn open(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::RECEIVING_EDIT)?;
    Ok(success_response(state.receiving.open(id).await?))
}

async fn close(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::RECEIVING_EDIT)?;
    Ok(success_response(
        state.receiving.close(id, Some(user.user_id)).await?,
    ))
}
