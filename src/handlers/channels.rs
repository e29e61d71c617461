use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::entities::channel::ChannelType;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_channels).post(create_channel))
        .route("/:id/sync", post(sync_channel))
        .route("/sync-all", post(sync_all))
        .route("/feeds", post(create_feed))
        .route("/products/:product_id/sync", post(sync_product))
}

async fn list_channels(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CHANNELS_VIEW)?;
    Ok(success_response(state.channel_sync.list_channels().await?))
}

#[derive(Debug, Deserialize)]
struct CreateChannelRequest {
    name: String,
    channel_type: ChannelType,
    default_external_location_ref: Option<String>,
    config: Option<serde_json::Value>,
}

async fn create_channel(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateChannelRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CHANNELS_SYNC)?;
    Ok(created_response(
        state
            .channel_sync
            .create_channel(
                &payload.name,
                payload.channel_type,
                payload.default_external_location_ref,
                payload.config,
            )
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct CreateFeedRequest {
    channel_id: Uuid,
    variant_id: Uuid,
    external_variant_ref: String,
    external_inventory_item_ref: Option<String>,
}

async fn create_feed(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateFeedRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CHANNELS_SYNC)?;
    Ok(created_response(
        state
            .channel_sync
            .create_feed(
                payload.channel_id,
                payload.variant_id,
                &payload.external_variant_ref,
                payload.external_inventory_item_ref,
            )
            .await?,
    ))
}

async fn sync_channel(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CHANNELS_SYNC)?;
    Ok(success_response(state.channel_sync.sync_channel(id).await?))
}

async fn sync_all(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CHANNELS_SYNC)?;
    Ok(success_response(state.channel_sync.sync_all_products().await?))
}

async fn sync_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CHANNELS_SYNC)?;
    Ok(success_response(state.channel_sync.sync_product(product_id).await?))
}
