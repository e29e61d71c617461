use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, no_content_response, success_response};
use crate::services::locations::{CreateLocationInput, CreateWarehouseInput, UpdateWarehouseInput};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/warehouses", get(list_warehouses).post(create_warehouse))
        .route("/warehouses/:id", put(update_warehouse))
        .route("/warehouses/:id/locations", get(list_locations))
        .route("/", post(create_location))
        .route("/:id", delete(delete_location))
}

async fn list_warehouses(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::LOCATIONS_VIEW)?;
    Ok(success_response(state.locations.list_warehouses().await?))
}

async fn create_warehouse(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateWarehouseInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::LOCATIONS_EDIT)?;
    Ok(created_response(
        state.locations.create_warehouse(payload).await?,
    ))
}

async fn update_warehouse(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWarehouseInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::LOCATIONS_EDIT)?;
    Ok(success_response(
        state.locations.update_warehouse(id, payload).await?,
    ))
}

async fn list_locations(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::LOCATIONS_VIEW)?;
    Ok(success_response(state.locations.list_locations(id).await?))
}

async fn create_location(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateLocationInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::LOCATIONS_EDIT)?;
    Ok(created_response(
        state.locations.create_location(payload).await?,
    ))
}

async fn delete_location(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::LOCATIONS_EDIT)?;
    state.locations.delete_location(id).await?;
    Ok(no_content_response())
}
