//! Ledger operations, balance invariants, and the ATP projection.

mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use common::{seed_piece_case_product, seed_warehouse, test_state};
use wms_api::entities::inventory_balance::StockState;
use wms_api::errors::ServiceError;
use wms_api::services::inventory::{TransactionFilter, TxnRefs};

#[tokio::test]
async fn receive_pick_ship_moves_stock_through_states() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "WIDGET").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    let order_line = Uuid::new_v4();

    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 10, TxnRefs::default())
        .await
        .expect("receive");
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::OnHand)
            .await
            .unwrap(),
        10
    );

    state
        .inventory
        .pick(catalog.piece_id, wh.bin_a, 4, order_line, TxnRefs::default())
        .await
        .expect("pick");
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::OnHand)
            .await
            .unwrap(),
        6
    );
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::Picked)
            .await
            .unwrap(),
        4
    );

    let shipped = state
        .inventory
        .ship(order_line, TxnRefs::default())
        .await
        .expect("ship");
    assert_eq!(shipped.len(), 1);
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::Picked)
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::Shipped)
            .await
            .unwrap(),
        4
    );
}

#[tokio::test]
async fn pick_beyond_on_hand_is_refused() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "GADGET").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 3, TxnRefs::default())
        .await
        .unwrap();

    let err = state
        .inventory
        .pick(catalog.piece_id, wh.bin_a, 5, Uuid::new_v4(), TxnRefs::default())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // The failed pick left nothing behind.
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::OnHand)
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::Picked)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn adjust_requires_reason_and_floor_at_zero() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "BOLT").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    let err = state
        .inventory
        .adjust(
            catalog.piece_id,
            wh.bin_a,
            StockState::OnHand,
            5,
            "  ",
            TxnRefs::default(),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));

    state
        .inventory
        .adjust(
            catalog.piece_id,
            wh.bin_a,
            StockState::OnHand,
            5,
            "cycle_count",
            TxnRefs::default(),
        )
        .await
        .expect("positive adjustment");

    let err = state
        .inventory
        .adjust(
            catalog.piece_id,
            wh.bin_a,
            StockState::OnHand,
            -9,
            "cycle_count",
            TxnRefs::default(),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));
}

#[tokio::test]
async fn unknown_location_and_variant_are_not_found() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "NUT").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    let err = state
        .inventory
        .receive(catalog.piece_id, Uuid::new_v4(), 1, TxnRefs::default())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = state
        .inventory
        .receive(Uuid::new_v4(), wh.bin_a, 1, TxnRefs::default())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn transfer_then_undo_restores_balances_exactly() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "CLIP").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 9, TxnRefs::default())
        .await
        .unwrap();

    let (batch_id, token) = state
        .inventory
        .transfer(catalog.piece_id, wh.bin_a, wh.bin_b, 5, TxnRefs::default())
        .await
        .expect("transfer");
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::OnHand)
            .await
            .unwrap(),
        4
    );
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_b, StockState::OnHand)
            .await
            .unwrap(),
        5
    );

    // The pair shares one batch, with legs netting to zero.
    let (legs, _) = state
        .inventory
        .list_transactions(TransactionFilter {
            batch_id: Some(batch_id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(legs.len(), 2);
    assert_eq!(legs.iter().map(|t| t.variant_qty_delta).sum::<i64>(), 0);

    state.inventory.undo_transfer(token).await.expect("undo");
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::OnHand)
            .await
            .unwrap(),
        9
    );
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_b, StockState::OnHand)
            .await
            .unwrap(),
        0
    );

    // Two transfer events total: the original pair and its mirror.
    let (all, _) = state
        .inventory
        .list_transactions(TransactionFilter {
            variant_id: Some(catalog.piece_id),
            transaction_type: Some(
                wms_api::entities::inventory_transaction::TransactionType::Transfer,
            ),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn undo_fails_after_subsequent_activity_on_either_cell() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "PIN").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 8, TxnRefs::default())
        .await
        .unwrap();
    let (_, token) = state
        .inventory
        .transfer(catalog.piece_id, wh.bin_a, wh.bin_b, 5, TxnRefs::default())
        .await
        .unwrap();

    // A pick from the destination supersedes the transfer.
    state
        .inventory
        .pick(catalog.piece_id, wh.bin_b, 1, Uuid::new_v4(), TxnRefs::default())
        .await
        .unwrap();

    let err = state.inventory.undo_transfer(token).await.unwrap_err();
    assert_matches!(err, ServiceError::NotUndoable(_));

    // A second undo after success also fails: the mirror superseded it.
    let state2 = test_state().await;
    let catalog2 = seed_piece_case_product(&state2, "PIN").await;
    let wh2 = seed_warehouse(&state2, "MAIN").await;
    state2
        .inventory
        .receive(catalog2.piece_id, wh2.bin_a, 8, TxnRefs::default())
        .await
        .unwrap();
    let (_, token2) = state2
        .inventory
        .transfer(catalog2.piece_id, wh2.bin_a, wh2.bin_b, 5, TxnRefs::default())
        .await
        .unwrap();
    state2.inventory.undo_transfer(token2).await.unwrap();
    let err = state2.inventory.undo_transfer(token2).await.unwrap_err();
    assert_matches!(err, ServiceError::NotUndoable(_));
}

#[tokio::test]
async fn atp_is_fungible_across_uom_siblings() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "SODA").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    // Receive 24 pieces into bin A.
    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 24, TxnRefs::default())
        .await
        .unwrap();

    let atp = state
        .inventory
        .atp_for_product_in_warehouse(catalog.product_id, wh.warehouse_id)
        .await
        .unwrap();
    assert_eq!(atp.atp_base, 24);
    let piece = atp.variants.iter().find(|v| v.variant_id == catalog.piece_id).unwrap();
    let case = atp.variants.iter().find(|v| v.variant_id == catalog.case_id).unwrap();
    assert_eq!(piece.atp_units, 24);
    assert_eq!(case.atp_units, 2);

    // Sell one case: 12 base units leave the pool.
    state
        .inventory
        .pick(catalog.piece_id, wh.bin_a, 12, Uuid::new_v4(), TxnRefs::default())
        .await
        .unwrap();

    let atp = state
        .inventory
        .atp_for_product_in_warehouse(catalog.product_id, wh.warehouse_id)
        .await
        .unwrap();
    assert_eq!(atp.atp_base, 12);
    let piece = atp.variants.iter().find(|v| v.variant_id == catalog.piece_id).unwrap();
    let case = atp.variants.iter().find(|v| v.variant_id == catalog.case_id).unwrap();
    assert_eq!(piece.atp_units, 12);
    assert_eq!(case.atp_units, 1);
}

#[tokio::test]
async fn non_pickable_stock_stays_out_of_atp() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "JAR").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    state
        .inventory
        .receive(catalog.piece_id, wh.bulk, 100, TxnRefs::default())
        .await
        .unwrap();
    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 7, TxnRefs::default())
        .await
        .unwrap();

    let atp = state
        .inventory
        .atp_for_product_in_warehouse(catalog.product_id, wh.warehouse_id)
        .await
        .unwrap();
    assert_eq!(atp.atp_base, 7);
}

#[tokio::test]
async fn base_qty_delta_tracks_units_per_variant() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "CAN").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    // Receive 2 cases: each ledger row must carry 24 base units.
    state
        .inventory
        .receive(catalog.case_id, wh.bulk, 2, TxnRefs::default())
        .await
        .unwrap();

    let (rows, _) = state
        .inventory
        .list_transactions(TransactionFilter {
            variant_id: Some(catalog.case_id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].variant_qty_delta, 2);
    assert_eq!(rows[0].base_qty_delta, 24);
}

#[tokio::test]
async fn total_owned_quantity_equals_boundary_crossing_deltas() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "DISK").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    let order_line = Uuid::new_v4();

    // A mix of boundary crossings and internal state moves.
    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 20, TxnRefs::default())
        .await
        .unwrap();
    state
        .inventory
        .adjust(
            catalog.piece_id,
            wh.bin_a,
            StockState::OnHand,
            -3,
            "shrinkage",
            TxnRefs::default(),
        )
        .await
        .unwrap();
    state
        .inventory
        .transfer(catalog.piece_id, wh.bin_a, wh.bin_b, 6, TxnRefs::default())
        .await
        .unwrap();
    state
        .inventory
        .pick(catalog.piece_id, wh.bin_b, 2, order_line, TxnRefs::default())
        .await
        .unwrap();
    state
        .inventory
        .ship(order_line, TxnRefs::default())
        .await
        .unwrap();

    // Total across every cell and state equals the signed sum of deltas
    // on rows crossing the external boundary; internal moves conserve.
    let balances = state
        .inventory
        .balances_for_variant(catalog.piece_id)
        .await
        .unwrap();
    let total: i64 = balances.iter().map(|b| b.quantity).sum();
    assert_eq!(total, 20 - 3);
    assert!(balances.iter().all(|b| b.quantity >= 0));

    let (rows, _) = state
        .inventory
        .list_transactions(TransactionFilter {
            variant_id: Some(catalog.piece_id),
            ..Default::default()
        })
        .await
        .unwrap();
    let boundary_sum: i64 = rows
        .iter()
        .filter(|t| {
            t.source_state == StockState::External || t.target_state == StockState::External
        })
        .map(|t| t.variant_qty_delta)
        .sum();
    assert_eq!(boundary_sum, total);
}

#[tokio::test]
async fn reserve_walks_pickable_cells_fifo_and_enforces_availability() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "CUP").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    let order_line = Uuid::new_v4();

    // Bin A filled first, then bin B.
    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 3, TxnRefs::default())
        .await
        .unwrap();
    state
        .inventory
        .receive(catalog.piece_id, wh.bin_b, 5, TxnRefs::default())
        .await
        .unwrap();

    let err = state
        .inventory
        .reserve(catalog.piece_id, 9, order_line)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    state
        .inventory
        .reserve(catalog.piece_id, 5, order_line)
        .await
        .expect("reserve");

    // FIFO: all of bin A first, remainder from bin B.
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::Committed)
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_b, StockState::Committed)
            .await
            .unwrap(),
        2
    );

    state
        .inventory
        .unreserve(catalog.piece_id, 5, order_line)
        .await
        .expect("unreserve");
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::OnHand)
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_b, StockState::OnHand)
            .await
            .unwrap(),
        5
    );
}

#[tokio::test]
async fn replenish_move_converts_between_uom_siblings() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "TIN").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    state
        .inventory
        .receive(catalog.case_id, wh.bulk, 3, TxnRefs::default())
        .await
        .unwrap();

    // Break one case of 12 into pieces at the pick face.
    state
        .inventory
        .replenish_move(
            catalog.case_id,
            wh.bulk,
            1,
            catalog.piece_id,
            wh.bin_a,
            12,
            TxnRefs::default(),
        )
        .await
        .expect("case break");

    assert_eq!(
        state
            .inventory
            .balance(catalog.case_id, wh.bulk, StockState::OnHand)
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::OnHand)
            .await
            .unwrap(),
        12
    );

    // An unbalanced conversion is rejected.
    let err = state
        .inventory
        .replenish_move(
            catalog.case_id,
            wh.bulk,
            1,
            catalog.piece_id,
            wh.bin_a,
            10,
            TxnRefs::default(),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));
}
