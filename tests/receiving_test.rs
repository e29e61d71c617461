//! Receiving close semantics: ledger commits, PO roll-up, idempotence,
//! CSV line import.

mod common;

use common::{seed_piece_case_product, seed_warehouse, test_state};
use wms_api::entities::inventory_balance::StockState;
use wms_api::entities::purchase_order::PoStatus;
use wms_api::entities::purchase_order_line::PoLineStatus;
use wms_api::entities::receiving_order::{ReceivingSourceType, ReceivingStatus};
use wms_api::services::inventory::TransactionFilter;
use wms_api::services::purchasing::{CreatePoInput, CreateVendorInput, PoLineInput};
use wms_api::services::receiving::{
    CreateReceivingOrderInput, ReceivingLineInput, UpdateReceivingLineInput,
};
use wms_api::AppState;

async fn seed_sent_po(
    state: &AppState,
    variant_id: uuid::Uuid,
    warehouse_id: uuid::Uuid,
    qty: i64,
) -> uuid::Uuid {
    let vendor = state
        .purchasing
        .create_vendor(CreateVendorInput {
            code: "VEND".to_string(),
            name: "Vendor".to_string(),
            contact_email: None,
            contact_phone: None,
            currency: "USD".to_string(),
            payment_terms: None,
        })
        .await
        .unwrap();
    let po = state
        .purchasing
        .create_po(CreatePoInput {
            vendor_id: vendor.id,
            warehouse_id: Some(warehouse_id),
            priority: None,
            expected_delivery_date: None,
            discount_cents: 0,
            tax_cents: 0,
            shipping_cents: 0,
            notes: None,
        })
        .await
        .unwrap();
    state
        .purchasing
        .add_line(
            po.id,
            PoLineInput {
                variant_id,
                unit_cost_cents: 150,
                order_qty: qty,
                discount_pct: 0,
                tax_pct: 0,
            },
        )
        .await
        .unwrap();
    state.purchasing.submit(po.id, None).await.unwrap();
    state.purchasing.send(po.id, None).await.unwrap();
    po.id
}

async fn receive_from_po(
    state: &AppState,
    po_id: uuid::Uuid,
    putaway: uuid::Uuid,
    qty: i64,
) -> uuid::Uuid {
    let order = state.receiving.create_from_po(po_id).await.unwrap();
    let lines = state.receiving.get_lines(order.id).await.unwrap();
    state
        .receiving
        .update_line(
            lines[0].id,
            UpdateReceivingLineInput {
                received_qty: Some(qty),
                damaged_qty: None,
                putaway_location_id: Some(putaway),
            },
        )
        .await
        .unwrap();
    state.receiving.close(order.id, None).await.unwrap();
    order.id
}

#[tokio::test]
async fn close_posts_ledger_receipts_into_putaway_bins() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "CRATE").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    let po_id = seed_sent_po(&state, catalog.piece_id, wh.warehouse_id, 10).await;

    receive_from_po(&state, po_id, wh.bin_a, 10).await;

    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::OnHand)
            .await
            .unwrap(),
        10
    );
}

#[tokio::test]
async fn partial_then_final_receipt_rolls_up_the_po() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "BOX").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    let po_id = seed_sent_po(&state, catalog.piece_id, wh.warehouse_id, 10).await;

    // First receipt of 4.
    receive_from_po(&state, po_id, wh.bin_a, 4).await;
    let po = state.purchasing.get_po(po_id).await.unwrap();
    assert_eq!(po.status, PoStatus::PartiallyReceived);
    let lines = state.purchasing.get_po_lines(po_id).await.unwrap();
    assert_eq!(lines[0].received_qty, 4);
    assert_eq!(lines[0].status, PoLineStatus::PartiallyReceived);

    // Second receipt of the remaining 6.
    receive_from_po(&state, po_id, wh.bin_a, 6).await;
    let po = state.purchasing.get_po(po_id).await.unwrap();
    assert_eq!(po.status, PoStatus::Received);
    let lines = state.purchasing.get_po_lines(po_id).await.unwrap();
    assert_eq!(lines[0].received_qty, 10);
    assert_eq!(lines[0].status, PoLineStatus::Received);
}

#[tokio::test]
async fn reclosing_is_a_no_op() {
    let state = test_state().await;
    let _catalog = seed_piece_case_product(&state, "PALLET").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    let order = state
        .receiving
        .create(CreateReceivingOrderInput {
            source_type: ReceivingSourceType::Blind,
            vendor_id: None,
            warehouse_id: Some(wh.warehouse_id),
            purchase_order_id: None,
        })
        .await
        .unwrap();
    state
        .receiving
        .add_line(
            order.id,
            ReceivingLineInput {
                sku: "PALLET".to_string(),
                name: None,
                expected_qty: 0,
                unit_cost_cents: None,
                putaway_location_id: Some(wh.bin_a),
            },
        )
        .await
        .unwrap();
    let lines = state.receiving.get_lines(order.id).await.unwrap();
    state
        .receiving
        .update_line(
            lines[0].id,
            UpdateReceivingLineInput {
                received_qty: Some(7),
                damaged_qty: None,
                putaway_location_id: Some(wh.bin_a),
            },
        )
        .await
        .unwrap();

    let closed = state.receiving.close(order.id, None).await.unwrap();
    assert_eq!(closed.status, ReceivingStatus::Closed);
    let (txns_before, _) = state
        .inventory
        .list_transactions(TransactionFilter::default())
        .await
        .unwrap();

    let again = state.receiving.close(order.id, None).await.unwrap();
    assert_eq!(again.status, ReceivingStatus::Closed);
    assert_eq!(again.closed_at, closed.closed_at);
    let (txns_after, _) = state
        .inventory
        .list_transactions(TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(txns_before.len(), txns_after.len());
}

#[tokio::test]
async fn csv_import_reports_row_errors_without_aborting() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "WRAP").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    let order = state
        .receiving
        .create(CreateReceivingOrderInput {
            source_type: ReceivingSourceType::InitialLoad,
            vendor_id: None,
            warehouse_id: Some(wh.warehouse_id),
            purchase_order_id: None,
        })
        .await
        .unwrap();

    let csv = format!(
        "sku,qty,location,notes\n\
         {},25,A-01,\"fragile, top shelf\"\n\
         UNKNOWN-SKU,5,A-01,\n\
         {},not_a_number,A-01,\n\
         {}-C12,3,BULK-01,\n",
        "WRAP", "WRAP", "WRAP"
    );
    let report = state
        .receiving
        .import_lines_csv(order.id, &csv)
        .await
        .unwrap();
    assert_eq!(report.imported, 2);
    assert_eq!(report.errors.len(), 2);

    let lines = state.receiving.get_lines(order.id).await.unwrap();
    assert_eq!(lines.len(), 2);
    let piece_line = lines.iter().find(|l| l.sku == "WRAP").unwrap();
    assert_eq!(piece_line.received_qty, 25);
    assert_eq!(piece_line.variant_id, Some(catalog.piece_id));
    assert_eq!(piece_line.notes.as_deref(), Some("fragile, top shelf"));

    // Close the import and verify stock landed where the CSV said.
    state.receiving.close(order.id, None).await.unwrap();
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, wh.bin_a, StockState::OnHand)
            .await
            .unwrap(),
        25
    );
    assert_eq!(
        state
            .inventory
            .balance(catalog.case_id, wh.bulk, StockState::OnHand)
            .await
            .unwrap(),
        3
    );
}
