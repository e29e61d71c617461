use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

pub fn roles_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_roles))
        .route("/:id/permissions", put(set_role_permissions))
}

pub fn permissions_routes() -> Router<AppState> {
    Router::new().route("/", get(list_permissions))
}

/// `{user, roles[], permissions[]}` for the calling identity.
async fn me(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let profile = state.rbac.profile(user.user_id).await?;
    Ok(success_response(profile))
}

async fn list_roles(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ROLES_VIEW)?;
    let roles = state.rbac.list_roles().await?;
    Ok(success_response(roles))
}

async fn list_permissions(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ROLES_VIEW)?;
    Ok(success_response(state.rbac.list_permissions()))
}

#[derive(Debug, Deserialize)]
struct SetPermissionsRequest {
    permissions: Vec<String>,
}

async fn set_role_permissions(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<SetPermissionsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::ROLES_EDIT)?;
    let granted = state
        .rbac
        .set_role_permissions(role_id, payload.permissions)
        .await?;
    Ok(success_response(granted))
}
