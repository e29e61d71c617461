//! Order management and picking: combining, wave generation, short
//! picks, and the group shipping flow.

mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use common::{seed_piece_case_product, seed_warehouse, test_state};
use wms_api::entities::inventory_balance::StockState;
use wms_api::entities::pick_task::PickTaskStatus;
use wms_api::entities::pick_wave::PickMode;
use wms_api::entities::sales_order::SalesOrderStatus;
use wms_api::errors::ServiceError;
use wms_api::services::inventory::TxnRefs;
use wms_api::services::orders::{CreateOrderInput, OrderLineInput, OrderView};
use wms_api::AppState;

fn order_input(variant_id: Uuid, qty: i64, street: &str, customer: &str) -> CreateOrderInput {
    CreateOrderInput {
        order_number: None,
        channel_id: None,
        warehouse_id: None,
        customer_name: customer.to_string(),
        customer_email: None,
        ship_street: street.to_string(),
        ship_city: "Springfield".to_string(),
        ship_state: "IL".to_string(),
        ship_postal: "62701".to_string(),
        ship_country: "US".to_string(),
        priority: None,
        lines: vec![OrderLineInput { variant_id, qty }],
    }
}

async fn stock(state: &AppState, variant_id: Uuid, location_id: Uuid, qty: i64) {
    state
        .inventory
        .receive(variant_id, location_id, qty, TxnRefs::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn orders_to_the_same_address_combine_and_split_back() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "SOAP").await;
    let _wh = seed_warehouse(&state, "MAIN").await;

    let a = state
        .orders
        .create_order(order_input(catalog.piece_id, 2, "12 Main St", "Pat Doe"))
        .await
        .unwrap();
    // Same address, different spacing and case: still combinable.
    let b = state
        .orders
        .create_order(order_input(catalog.piece_id, 3, "  12  MAIN st ", "pat doe"))
        .await
        .unwrap();

    let result = state.orders.combine(vec![a.id, b.id]).await.unwrap();
    assert_eq!(result.parent_order_id, a.id);
    assert_eq!(result.child_order_ids, vec![b.id]);

    let members = state.orders.group_members(result.group_id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].id, a.id);

    // Nothing picked yet: uncombine is allowed.
    let released = state.orders.uncombine(result.group_id).await.unwrap();
    assert_eq!(released, 2);
    let a = state.orders.get_order(a.id).await.unwrap();
    assert!(a.combined_group_id.is_none());
}

#[tokio::test]
async fn combining_different_destinations_is_refused() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "LOTION").await;

    let a = state
        .orders
        .create_order(order_input(catalog.piece_id, 1, "12 Main St", "Pat Doe"))
        .await
        .unwrap();
    let b = state
        .orders
        .create_order(order_input(catalog.piece_id, 1, "99 Oak Ave", "Pat Doe"))
        .await
        .unwrap();

    let err = state.orders.combine(vec![a.id, b.id]).await.unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));

    let c = state
        .orders
        .create_order(order_input(catalog.piece_id, 1, "12 Main St", "Sam Lee"))
        .await
        .unwrap();
    let err = state.orders.combine(vec![a.id, c.id]).await.unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));
}

#[tokio::test]
async fn allocate_checks_stock_and_hold_blocks_release() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "TOWEL").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    let order = state
        .orders
        .create_order(order_input(catalog.piece_id, 5, "12 Main St", "Pat Doe"))
        .await
        .unwrap();

    // Nothing on hand yet.
    let err = state.orders.allocate(order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    stock(&state, catalog.piece_id, wh.bin_a, 10).await;
    state.orders.set_hold(order.id, true).await.unwrap();
    let err = state.orders.allocate(order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    state.orders.set_hold(order.id, false).await.unwrap();
    let order = state.orders.allocate(order.id).await.unwrap();
    assert_eq!(order.status, SalesOrderStatus::Allocated);
}

async fn allocated_released_order(
    state: &AppState,
    variant_id: Uuid,
    qty: i64,
    street: &str,
) -> Uuid {
    let order = state
        .orders
        .create_order(order_input(variant_id, qty, street, "Pat Doe"))
        .await
        .unwrap();
    state.orders.allocate(order.id).await.unwrap();
    state.orders.release_to_picking(order.id).await.unwrap();
    order.id
}

#[tokio::test]
async fn wave_tasks_walk_zone_then_bin_order() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "PASTA").await;
    let other = seed_piece_case_product(&state, "RICE").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    // PASTA stock sits in A-02, RICE in A-01: the walk starts at A-01.
    stock(&state, catalog.piece_id, wh.bin_b, 10).await;
    stock(&state, other.piece_id, wh.bin_a, 10).await;

    let o1 = allocated_released_order(&state, catalog.piece_id, 2, "1 First St").await;
    let o2 = allocated_released_order(&state, other.piece_id, 3, "2 Second St").await;

    let (wave, tasks) = state
        .picking
        .generate_wave(wh.warehouse_id, PickMode::Batch, None, None)
        .await
        .unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].order_id, o2);
    assert_eq!(tasks[0].location_id, wh.bin_a);
    assert_eq!(tasks[1].order_id, o1);
    assert_eq!(tasks[1].location_id, wh.bin_b);
    assert_eq!(tasks[0].sequence, 1);
    assert_eq!(tasks[1].sequence, 2);

    // Orders moved into picking.
    let o1 = state.orders.get_order(o1).await.unwrap();
    assert_eq!(o1.status, SalesOrderStatus::Picking);
    let _ = wave;
}

#[tokio::test]
async fn confirm_pick_completes_orders_and_wave() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "OLIVE").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    stock(&state, catalog.piece_id, wh.bin_a, 10).await;

    let order_id = allocated_released_order(&state, catalog.piece_id, 4, "12 Main St").await;
    let (wave, tasks) = state
        .picking
        .generate_wave(wh.warehouse_id, PickMode::Single, None, None)
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);

    let task = state.picking.confirm_pick(tasks[0].id, 4, None).await.unwrap();
    assert_eq!(task.status, PickTaskStatus::Completed);

    let order = state.orders.get_order(order_id).await.unwrap();
    assert_eq!(order.status, SalesOrderStatus::Picked);
    let wave = state.picking.get_wave(wave.id).await.unwrap();
    assert_eq!(
        wave.status,
        wms_api::entities::pick_wave::WaveStatus::Completed
    );

    // Ship and verify the ledger moved picked -> shipped.
    let shipped = state.orders.ship_order(order_id, None).await.unwrap();
    assert_eq!(shipped, vec![order_id]);
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::Shipped)
            .await
            .unwrap(),
        4
    );
    let order = state.orders.get_order(order_id).await.unwrap();
    assert_eq!(order.status, SalesOrderStatus::Shipped);
}

#[tokio::test]
async fn short_pick_falls_back_then_surfaces_exception() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "HONEY").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    // 3 in A-01, 2 in A-02; the order wants 5.
    stock(&state, catalog.piece_id, wh.bin_a, 3).await;
    stock(&state, catalog.piece_id, wh.bin_b, 2).await;

    let order_id = allocated_released_order(&state, catalog.piece_id, 5, "12 Main St").await;
    let (wave, tasks) = state
        .picking
        .generate_wave(wh.warehouse_id, PickMode::Single, None, None)
        .await
        .unwrap();
    // The planner already split across the two cells.
    assert_eq!(tasks.len(), 2);

    // Operator finds only 1 at the first location; a fallback task for
    // the remainder is appended against the other bin's stock.
    state.picking.confirm_pick(tasks[0].id, 1, None).await.unwrap();
    let all_tasks = state.picking.get_tasks(wave.id).await.unwrap();
    assert_eq!(all_tasks.len(), 3);
    let fallback = &all_tasks[2];
    assert_eq!(fallback.location_id, wh.bin_b);
    assert_eq!(fallback.qty, 2);

    // Supervisor writes the loss off the first bin.
    state
        .inventory
        .adjust(
            catalog.piece_id,
            wh.bin_a,
            StockState::OnHand,
            -2,
            "damaged",
            TxnRefs::default(),
        )
        .await
        .unwrap();

    // The planned pick at the second bin empties it.
    state.picking.confirm_pick(tasks[1].id, 2, None).await.unwrap();
    // The fallback finds nothing left; no other bin has stock.
    state.picking.confirm_pick(fallback.id, 0, None).await.unwrap();

    // 5 wanted, 3 on the floor after the loss: the order is short and
    // surfaces as an exception, with no negative balances anywhere.
    let order = state.orders.get_order(order_id).await.unwrap();
    assert_eq!(order.status, SalesOrderStatus::Exception);
    for location in [wh.bin_a, wh.bin_b] {
        let on_hand = state
            .inventory
            .balance(catalog.piece_id, location, StockState::OnHand)
            .await
            .unwrap();
        assert!(on_hand >= 0);
    }

    let exceptions = state
        .orders
        .list_orders(Some(OrderView::Exceptions), None)
        .await
        .unwrap();
    assert_eq!(exceptions.len(), 1);
}

#[tokio::test]
async fn combined_groups_pick_under_the_parent_and_ship_together() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "CANDLE").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    stock(&state, catalog.piece_id, wh.bin_a, 20).await;

    let a = state
        .orders
        .create_order(order_input(catalog.piece_id, 2, "12 Main St", "Pat Doe"))
        .await
        .unwrap();
    let b = state
        .orders
        .create_order(order_input(catalog.piece_id, 3, "12 Main St", "Pat Doe"))
        .await
        .unwrap();
    let combined = state.orders.combine(vec![a.id, b.id]).await.unwrap();

    for id in [a.id, b.id] {
        state.orders.allocate(id).await.unwrap();
        state.orders.release_to_picking(id).await.unwrap();
    }
    let (_, tasks) = state
        .picking
        .generate_wave(wh.warehouse_id, PickMode::Batch, None, None)
        .await
        .unwrap();

    // Every task references the group parent for drop-off.
    assert!(tasks.iter().all(|t| t.order_id == combined.parent_order_id));

    for task in &tasks {
        state.picking.confirm_pick(task.id, task.qty, None).await.unwrap();
    }

    // Children keep their own status; shipping the parent ships all.
    let b_model = state.orders.get_order(b.id).await.unwrap();
    assert_eq!(b_model.status, SalesOrderStatus::Picked);

    let err = state.orders.ship_order(b.id, None).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    let shipped = state.orders.ship_order(a.id, None).await.unwrap();
    assert_eq!(shipped.len(), 2);
    let b_model = state.orders.get_order(b.id).await.unwrap();
    assert_eq!(b_model.status, SalesOrderStatus::Shipped);
}
