pub mod auth;
pub mod catalog;
pub mod channels;
pub mod common;
pub mod inventory;
pub mod locations;
pub mod orders;
pub mod picking;
pub mod purchasing;
pub mod receiving;
pub mod replenishment;
pub mod shipments;

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::AppState;

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// The full `/api` surface.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::auth_routes())
        .nest("/roles", auth::roles_routes())
        .nest("/permissions", auth::permissions_routes())
        .nest("/catalog", catalog::routes())
        .nest("/locations", locations::routes())
        .nest("/inventory", inventory::routes())
        .nest("/purchasing", purchasing::routes())
        .nest("/inbound-shipments", shipments::routes())
        .nest("/receiving", receiving::routes())
        .nest("/oms", orders::routes())
        .nest("/orders", orders::actions_routes())
        .nest("/picking", picking::routes())
        .nest("/replen", replenishment::routes())
        .nest("/channels", channels::routes())
}
