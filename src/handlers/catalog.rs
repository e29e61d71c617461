use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{consts as perm, AuthenticatedUser};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, validate_input};
use crate::services::catalog::{
    CreateProductInput, CreateVariantInput, ExternalCatalogRow, UpdateProductInput,
};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", get(get_product).put(update_product))
        .route("/products/:id/variants", get(list_variants).post(create_variant))
        .route("/variants/lookup", get(lookup_variant))
        .route("/import", post(import_catalog))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateProductRequest {
    #[validate(length(min = 1))]
    base_sku: String,
    #[validate(length(min = 1))]
    name: String,
    category: Option<String>,
    brand: Option<String>,
    external_product_ref: Option<String>,
}

async fn create_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CATALOG_EDIT)?;
    validate_input(&payload)?;
    let product = state
        .catalog
        .create_product(CreateProductInput {
            base_sku: payload.base_sku,
            name: payload.name,
            category: payload.category,
            brand: payload.brand,
            external_product_ref: payload.external_product_ref,
        })
        .await?;
    Ok(created_response(product))
}

async fn get_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CATALOG_VIEW)?;
    Ok(success_response(state.catalog.get_product(id).await?))
}

async fn update_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CATALOG_EDIT)?;
    Ok(success_response(
        state.catalog.update_product(id, payload).await?,
    ))
}

async fn list_variants(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CATALOG_VIEW)?;
    Ok(success_response(state.catalog.variants_of(id).await?))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateVariantRequest {
    #[validate(length(min = 1))]
    sku: String,
    #[validate(length(min = 1))]
    name: String,
    #[validate(range(min = 1))]
    units_per_variant: i64,
    #[validate(range(min = 1, max = 4))]
    hierarchy_level: i32,
    barcode: Option<String>,
    external_variant_ref: Option<String>,
    external_inventory_item_ref: Option<String>,
    weight_grams: Option<i64>,
    length_mm: Option<i32>,
    width_mm: Option<i32>,
    height_mm: Option<i32>,
}

async fn create_variant(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<CreateVariantRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CATALOG_EDIT)?;
    validate_input(&payload)?;
    let variant = state
        .catalog
        .create_variant(CreateVariantInput {
            product_id,
            sku: payload.sku,
            name: payload.name,
            units_per_variant: payload.units_per_variant,
            hierarchy_level: payload.hierarchy_level,
            barcode: payload.barcode,
            external_variant_ref: payload.external_variant_ref,
            external_inventory_item_ref: payload.external_inventory_item_ref,
            weight_grams: payload.weight_grams,
            length_mm: payload.length_mm,
            width_mm: payload.width_mm,
            height_mm: payload.height_mm,
        })
        .await?;
    Ok(created_response(variant))
}

#[derive(Debug, Deserialize)]
struct LookupQuery {
    sku: Option<String>,
    barcode: Option<String>,
    external_ref: Option<String>,
}

async fn lookup_variant(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CATALOG_VIEW)?;
    let variant = if let Some(sku) = query.sku {
        state.catalog.find_variant_by_sku(&sku).await?
    } else if let Some(barcode) = query.barcode {
        state.catalog.find_variant_by_barcode(&barcode).await?
    } else if let Some(external_ref) = query.external_ref {
        state.catalog.find_variant_by_external_ref(&external_ref).await?
    } else {
        return Err(ServiceError::Validation(
            "one of sku, barcode or external_ref is required".into(),
        ));
    };
    Ok(success_response(variant))
}

async fn import_catalog(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(rows): Json<Vec<ExternalCatalogRow>>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(perm::CATALOG_EDIT)?;
    Ok(success_response(
        state.catalog.import_external_catalog(rows).await?,
    ))
}
