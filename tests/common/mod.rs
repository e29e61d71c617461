//! Shared bootstrap for integration tests: an in-memory sqlite database
//! with the full migration set, the service graph, and seed helpers.

#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use wms_api::channels::DriverRegistry;
use wms_api::config::AppConfig;
use wms_api::entities::location::LocationType;
use wms_api::entities::warehouse::InventorySourceType;
use wms_api::events::{event_channel, process_events};
use wms_api::services::catalog::{CreateProductInput, CreateVariantInput};
use wms_api::services::locations::{CreateLocationInput, CreateWarehouseInput};
use wms_api::{db, AppState};

pub async fn test_state() -> AppState {
    test_state_with_registry(DriverRegistry::new()).await
}

pub async fn test_state_with_registry(registry: DriverRegistry) -> AppState {
    let config = Arc::new(AppConfig::for_tests("sqlite::memory:"));
    let pool = db::connect(&config).await.expect("connect test database");
    db::run_migrations(&pool).await.expect("run migrations");

    let (event_sender, event_rx) = event_channel();
    let state = AppState::build(config, Arc::new(pool), event_sender, Arc::new(registry));

    // Drain events so publishers never block on a full queue.
    tokio::spawn(process_events(event_rx, None));
    state
}

pub struct SeededCatalog {
    pub product_id: Uuid,
    pub piece_id: Uuid,
    pub case_id: Uuid,
}

/// A product with a Piece (units=1) and a Case (units=12) variant.
pub async fn seed_piece_case_product(state: &AppState, base: &str) -> SeededCatalog {
    let product = state
        .catalog
        .create_product(CreateProductInput {
            base_sku: base.to_string(),
            name: format!("{base} product"),
            category: None,
            brand: None,
            external_product_ref: None,
        })
        .await
        .expect("create product");

    let piece = state
        .catalog
        .create_variant(CreateVariantInput {
            product_id: product.id,
            sku: base.to_string(),
            name: format!("{base} each"),
            units_per_variant: 1,
            hierarchy_level: 1,
            barcode: None,
            external_variant_ref: None,
            external_inventory_item_ref: None,
            weight_grams: Some(250),
            length_mm: None,
            width_mm: None,
            height_mm: None,
        })
        .await
        .expect("create piece variant");

    let case = state
        .catalog
        .create_variant(CreateVariantInput {
            product_id: product.id,
            sku: format!("{base}-C12"),
            name: format!("{base} case of 12"),
            units_per_variant: 12,
            hierarchy_level: 3,
            barcode: None,
            external_variant_ref: None,
            external_inventory_item_ref: None,
            weight_grams: Some(3000),
            length_mm: None,
            width_mm: None,
            height_mm: None,
        })
        .await
        .expect("create case variant");

    SeededCatalog {
        product_id: product.id,
        piece_id: piece.id,
        case_id: case.id,
    }
}

pub struct SeededWarehouse {
    pub warehouse_id: Uuid,
    pub bin_a: Uuid,
    pub bin_b: Uuid,
    pub bulk: Uuid,
    pub receiving_dock: Uuid,
}

/// One warehouse with two forward-pick bins, a bulk bin, and a dock.
pub async fn seed_warehouse(state: &AppState, code: &str) -> SeededWarehouse {
    let warehouse = state
        .locations
        .create_warehouse(CreateWarehouseInput {
            code: code.to_string(),
            name: format!("{code} warehouse"),
            is_default: true,
            external_location_ref: None,
            inventory_source_type: InventorySourceType::Internal,
        })
        .await
        .expect("create warehouse");

    let bin_a = state
        .locations
        .create_location(CreateLocationInput {
            warehouse_id: warehouse.id,
            code: "A-01".to_string(),
            location_type: LocationType::ForwardPick,
            is_pickable: true,
            zone_sequence: 1,
        })
        .await
        .expect("create bin A");
    let bin_b = state
        .locations
        .create_location(CreateLocationInput {
            warehouse_id: warehouse.id,
            code: "A-02".to_string(),
            location_type: LocationType::ForwardPick,
            is_pickable: true,
            zone_sequence: 1,
        })
        .await
        .expect("create bin B");
    let bulk = state
        .locations
        .create_location(CreateLocationInput {
            warehouse_id: warehouse.id,
            code: "BULK-01".to_string(),
            location_type: LocationType::BulkStorage,
            is_pickable: false,
            zone_sequence: 9,
        })
        .await
        .expect("create bulk bin");
    let receiving_dock = state
        .locations
        .create_location(CreateLocationInput {
            warehouse_id: warehouse.id,
            code: "DOCK-01".to_string(),
            location_type: LocationType::Receiving,
            is_pickable: false,
            zone_sequence: 99,
        })
        .await
        .expect("create dock");

    SeededWarehouse {
        warehouse_id: warehouse.id,
        bin_a: bin_a.id,
        bin_b: bin_b.id,
        bulk: bulk.id,
        receiving_dock: receiving_dock.id,
    }
}
