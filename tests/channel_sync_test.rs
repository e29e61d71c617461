//! Channel sync: ATP projection pushes, per-feed error recording, the
//! reactive trigger, and per-warehouse location pushes.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use common::{seed_piece_case_product, seed_warehouse, test_state_with_registry};
use wms_api::channels::{ChannelDriver, DriverRegistry, PushRequest};
use wms_api::entities::channel::ChannelType;
use wms_api::entities::warehouse::InventorySourceType;
use wms_api::errors::{ServiceError, ServiceResult};
use wms_api::services::inventory::TxnRefs;
use wms_api::services::locations::UpdateWarehouseInput;

#[derive(Clone, Default)]
struct RecordingDriver {
    pushes: Arc<Mutex<Vec<PushRequest>>>,
    fail_for_ref: Option<String>,
}

#[async_trait]
impl ChannelDriver for RecordingDriver {
    fn driver_type(&self) -> ChannelType {
        ChannelType::Custom
    }

    async fn push_inventory(&self, request: &PushRequest) -> ServiceResult<()> {
        if self.fail_for_ref.as_deref() == Some(request.feed.external_variant_ref.as_str()) {
            return Err(ServiceError::External("provider rejected the update".into()));
        }
        self.pushes.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[tokio::test]
async fn sync_records_floored_atp_per_feed() {
    let driver = RecordingDriver::default();
    let pushes = driver.pushes.clone();
    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(driver));
    let state = test_state_with_registry(registry).await;

    let catalog = seed_piece_case_product(&state, "FIZZ").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 30, TxnRefs::default())
        .await
        .unwrap();

    let channel = state
        .channel_sync
        .create_channel("storefront", ChannelType::Custom, None, None)
        .await
        .unwrap();
    let piece_feed = state
        .channel_sync
        .create_feed(channel.id, catalog.piece_id, "ext-piece", None)
        .await
        .unwrap();
    let case_feed = state
        .channel_sync
        .create_feed(channel.id, catalog.case_id, "ext-case", None)
        .await
        .unwrap();

    let outcomes = state.channel_sync.sync_product(catalog.product_id).await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.error.is_none()));

    // 30 base units: 30 pieces, 2 whole cases.
    let piece_feed = state.channel_sync.get_feed(piece_feed.id).await.unwrap();
    assert_eq!(piece_feed.last_synced_qty, Some(30));
    assert!(piece_feed.last_synced_at.is_some());
    let case_feed = state.channel_sync.get_feed(case_feed.id).await.unwrap();
    assert_eq!(case_feed.last_synced_qty, Some(2));

    assert_eq!(pushes.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn a_failing_feed_is_recorded_and_does_not_abort_the_batch() {
    let driver = RecordingDriver {
        pushes: Arc::new(Mutex::new(Vec::new())),
        fail_for_ref: Some("ext-piece".to_string()),
    };
    let pushes = driver.pushes.clone();
    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(driver));
    let state = test_state_with_registry(registry).await;

    let catalog = seed_piece_case_product(&state, "POP").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 12, TxnRefs::default())
        .await
        .unwrap();

    let channel = state
        .channel_sync
        .create_channel("storefront", ChannelType::Custom, None, None)
        .await
        .unwrap();
    let piece_feed = state
        .channel_sync
        .create_feed(channel.id, catalog.piece_id, "ext-piece", None)
        .await
        .unwrap();
    let case_feed = state
        .channel_sync
        .create_feed(channel.id, catalog.case_id, "ext-case", None)
        .await
        .unwrap();

    let outcomes = state.channel_sync.sync_product(catalog.product_id).await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes.iter().filter(|o| o.error.is_some()).count(), 1);

    let failed = state.channel_sync.get_feed(piece_feed.id).await.unwrap();
    assert!(failed.last_error.is_some());
    assert_eq!(failed.last_synced_qty, None);

    let ok = state.channel_sync.get_feed(case_feed.id).await.unwrap();
    assert_eq!(ok.last_synced_qty, Some(1));
    assert!(ok.last_error.is_none());

    // Only the healthy feed reached the provider.
    assert_eq!(pushes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn reactive_trigger_syncs_only_variants_with_feeds() {
    let driver = RecordingDriver::default();
    let pushes = driver.pushes.clone();
    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(driver));
    let state = test_state_with_registry(registry).await;

    let with_feed = seed_piece_case_product(&state, "TRACKED").await;
    let without_feed = seed_piece_case_product(&state, "UNTRACKED").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    let channel = state
        .channel_sync
        .create_channel("storefront", ChannelType::Custom, None, None)
        .await
        .unwrap();
    state
        .channel_sync
        .create_feed(channel.id, with_feed.piece_id, "ext-tracked", None)
        .await
        .unwrap();

    state
        .inventory
        .receive(with_feed.piece_id, wh.bin_a, 5, TxnRefs::default())
        .await
        .unwrap();
    state
        .inventory
        .receive(without_feed.piece_id, wh.bin_a, 5, TxnRefs::default())
        .await
        .unwrap();

    state
        .channel_sync
        .queue_sync_after_inventory_change(with_feed.piece_id)
        .await
        .unwrap();
    assert_eq!(pushes.lock().unwrap().len(), 1);

    state
        .channel_sync
        .queue_sync_after_inventory_change(without_feed.piece_id)
        .await
        .unwrap();
    // No feed: nothing pushed.
    assert_eq!(pushes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn externally_mapped_warehouses_get_per_location_pushes() {
    let driver = RecordingDriver::default();
    let pushes = driver.pushes.clone();
    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(driver));
    let state = test_state_with_registry(registry).await;

    let catalog = seed_piece_case_product(&state, "SPLIT").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    state
        .locations
        .update_warehouse(
            wh.warehouse_id,
            UpdateWarehouseInput {
                name: None,
                is_active: None,
                is_default: None,
                external_location_ref: Some("shop-loc-77".to_string()),
            },
        )
        .await
        .unwrap();

    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 9, TxnRefs::default())
        .await
        .unwrap();

    let channel = state
        .channel_sync
        .create_channel("storefront", ChannelType::Custom, None, None)
        .await
        .unwrap();
    state
        .channel_sync
        .create_feed(channel.id, catalog.piece_id, "ext-split", None)
        .await
        .unwrap();

    state.channel_sync.sync_product(catalog.product_id).await.unwrap();

    let recorded = pushes.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(
        recorded[0].external_location_ref.as_deref(),
        Some("shop-loc-77")
    );
    assert_eq!(recorded[0].qty, 9);
}

#[tokio::test]
async fn warehouse_update_sources_externally_is_excluded() {
    let driver = RecordingDriver::default();
    let pushes = driver.pushes.clone();
    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(driver));
    let state = test_state_with_registry(registry).await;

    let catalog = seed_piece_case_product(&state, "EDGE").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    // Externally sourced warehouses never get location-level pushes even
    // when mapped; the aggregate fallback applies instead.
    state
        .locations
        .create_warehouse(wms_api::services::locations::CreateWarehouseInput {
            code: "3PL".to_string(),
            name: "Third party".to_string(),
            is_default: false,
            external_location_ref: Some("threepl-loc".to_string()),
            inventory_source_type: InventorySourceType::External,
        })
        .await
        .unwrap();

    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 4, TxnRefs::default())
        .await
        .unwrap();
    let channel = state
        .channel_sync
        .create_channel(
            "storefront",
            ChannelType::Custom,
            Some("default-loc".to_string()),
            None,
        )
        .await
        .unwrap();
    state
        .channel_sync
        .create_feed(channel.id, catalog.piece_id, "ext-edge", None)
        .await
        .unwrap();

    state.channel_sync.sync_product(catalog.product_id).await.unwrap();
    let recorded = pushes.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].external_location_ref.as_deref(), Some("default-loc"));
    assert_eq!(recorded[0].qty, 4);
}
