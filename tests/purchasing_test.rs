//! Purchase order lifecycle, totals, approval tiers, reorder grouping.

mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use common::{seed_piece_case_product, test_state};
use wms_api::entities::purchase_order::PoStatus;
use wms_api::errors::ServiceError;
use wms_api::services::purchasing::{
    CreatePoInput, CreateVendorInput, PoLineInput, ReorderItem,
};

fn po_input(vendor_id: Uuid) -> CreatePoInput {
    CreatePoInput {
        vendor_id,
        warehouse_id: None,
        priority: None,
        expected_delivery_date: None,
        discount_cents: 0,
        tax_cents: 0,
        shipping_cents: 0,
        notes: None,
    }
}

async fn seed_vendor(state: &wms_api::AppState, code: &str) -> Uuid {
    state
        .purchasing
        .create_vendor(CreateVendorInput {
            code: code.to_string(),
            name: format!("{code} Supply Co"),
            contact_email: None,
            contact_phone: None,
            currency: "USD".to_string(),
            payment_terms: Some("NET30".to_string()),
        })
        .await
        .expect("create vendor")
        .id
}

#[tokio::test]
async fn totals_follow_discount_then_tax_per_line() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "WIDGET").await;
    let vendor_id = seed_vendor(&state, "ACME").await;

    let po = state.purchasing.create_po(po_input(vendor_id)).await.unwrap();
    state
        .purchasing
        .add_line(
            po.id,
            PoLineInput {
                variant_id: catalog.piece_id,
                unit_cost_cents: 500,
                order_qty: 10,
                discount_pct: 10,
                tax_pct: 5,
            },
        )
        .await
        .unwrap();

    let po = state.purchasing.get_po(po.id).await.unwrap();
    // 5000 subtotal, 500 discount, 225 tax on the discounted amount.
    assert_eq!(po.subtotal_cents, 5000);
    assert_eq!(po.grand_total_cents, 4725);
}

#[tokio::test]
async fn header_amounts_are_flat_adjustments() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "GEAR").await;
    let vendor_id = seed_vendor(&state, "ACME").await;

    let mut input = po_input(vendor_id);
    input.discount_cents = 300;
    input.tax_cents = 120;
    input.shipping_cents = 999;
    let po = state.purchasing.create_po(input).await.unwrap();
    state
        .purchasing
        .add_line(
            po.id,
            PoLineInput {
                variant_id: catalog.piece_id,
                unit_cost_cents: 1000,
                order_qty: 2,
                discount_pct: 0,
                tax_pct: 0,
            },
        )
        .await
        .unwrap();

    let po = state.purchasing.get_po(po.id).await.unwrap();
    assert_eq!(po.grand_total_cents, 2000 - 300 + 120 + 999);
}

#[tokio::test]
async fn approval_tier_boundary_is_inclusive_at_min() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "PUMP").await;
    let vendor_id = seed_vendor(&state, "ACME").await;
    state
        .purchasing
        .create_approval_tier("manager", 100_000, None)
        .await
        .unwrap();

    // $999.99 slips under the tier and auto-approves.
    let po = state.purchasing.create_po(po_input(vendor_id)).await.unwrap();
    state
        .purchasing
        .add_line(
            po.id,
            PoLineInput {
                variant_id: catalog.piece_id,
                unit_cost_cents: 99_999,
                order_qty: 1,
                discount_pct: 0,
                tax_pct: 0,
            },
        )
        .await
        .unwrap();
    let po = state.purchasing.submit(po.id, None).await.unwrap();
    assert_eq!(po.status, PoStatus::Approved);
    assert!(po.approval_tier_id.is_none());

    // $1000.00 lands on the tier and waits for approval.
    let po = state.purchasing.create_po(po_input(vendor_id)).await.unwrap();
    state
        .purchasing
        .add_line(
            po.id,
            PoLineInput {
                variant_id: catalog.piece_id,
                unit_cost_cents: 100_000,
                order_qty: 1,
                discount_pct: 0,
                tax_pct: 0,
            },
        )
        .await
        .unwrap();
    let po = state.purchasing.submit(po.id, None).await.unwrap();
    assert_eq!(po.status, PoStatus::PendingApproval);
    assert!(po.approval_tier_id.is_some());
}

#[tokio::test]
async fn transitions_are_gated_by_the_allowed_set() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "VALVE").await;
    let vendor_id = seed_vendor(&state, "ACME").await;

    let po = state.purchasing.create_po(po_input(vendor_id)).await.unwrap();
    state
        .purchasing
        .add_line(
            po.id,
            PoLineInput {
                variant_id: catalog.piece_id,
                unit_cost_cents: 100,
                order_qty: 1,
                discount_pct: 0,
                tax_pct: 0,
            },
        )
        .await
        .unwrap();

    // Draft cannot jump straight to sent.
    let err = state.purchasing.send(po.id, None).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    let po = state.purchasing.submit(po.id, None).await.unwrap();
    assert_eq!(po.status, PoStatus::Approved);
    let po = state.purchasing.send(po.id, None).await.unwrap();
    assert_eq!(po.status, PoStatus::Sent);
    let po = state.purchasing.acknowledge(po.id, None, None).await.unwrap();
    assert_eq!(po.status, PoStatus::Acknowledged);

    // Submitting an empty draft is refused.
    let empty = state.purchasing.create_po(po_input(vendor_id)).await.unwrap();
    let err = state.purchasing.submit(empty.id, None).await.unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));
}

#[tokio::test]
async fn edits_after_sent_create_revisions() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "HOSE").await;
    let vendor_id = seed_vendor(&state, "ACME").await;

    let po = state.purchasing.create_po(po_input(vendor_id)).await.unwrap();
    let line = state
        .purchasing
        .add_line(
            po.id,
            PoLineInput {
                variant_id: catalog.piece_id,
                unit_cost_cents: 250,
                order_qty: 4,
                discount_pct: 0,
                tax_pct: 0,
            },
        )
        .await
        .unwrap();

    state.purchasing.submit(po.id, None).await.unwrap();
    state.purchasing.send(po.id, None).await.unwrap();

    // Draft edits did not bump the revision counter; post-sent ones do.
    let before = state.purchasing.get_po(po.id).await.unwrap();
    assert_eq!(before.revision_number, 0);

    state
        .purchasing
        .update_line(line.id, Some(6), None)
        .await
        .unwrap();
    let after = state.purchasing.get_po(po.id).await.unwrap();
    assert_eq!(after.revision_number, 1);
    assert_eq!(after.grand_total_cents, 6 * 250);
}

#[tokio::test]
async fn on_order_sums_open_lines_only() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "DRUM").await;
    let vendor_id = seed_vendor(&state, "ACME").await;

    // Draft POs are not yet on order.
    let draft = state.purchasing.create_po(po_input(vendor_id)).await.unwrap();
    state
        .purchasing
        .add_line(
            draft.id,
            PoLineInput {
                variant_id: catalog.piece_id,
                unit_cost_cents: 100,
                order_qty: 50,
                discount_pct: 0,
                tax_pct: 0,
            },
        )
        .await
        .unwrap();
    let summary = state.purchasing.on_order(catalog.piece_id).await.unwrap();
    assert_eq!(summary.on_order_qty, 0);

    let mut input = po_input(vendor_id);
    input.expected_delivery_date = Some(chrono::NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
    let po = state.purchasing.create_po(input).await.unwrap();
    state
        .purchasing
        .add_line(
            po.id,
            PoLineInput {
                variant_id: catalog.piece_id,
                unit_cost_cents: 100,
                order_qty: 20,
                discount_pct: 0,
                tax_pct: 0,
            },
        )
        .await
        .unwrap();
    state.purchasing.submit(po.id, None).await.unwrap();

    let summary = state.purchasing.on_order(catalog.piece_id).await.unwrap();
    assert_eq!(summary.on_order_qty, 20);
    assert_eq!(
        summary.earliest_expected,
        Some(chrono::NaiveDate::from_ymd_opt(2026, 9, 1).unwrap())
    );
}

#[tokio::test]
async fn reorder_groups_by_preferred_vendor_and_fails_without_one() {
    let state = test_state().await;
    let widget = seed_piece_case_product(&state, "WIDGET").await;
    let gadget = seed_piece_case_product(&state, "GADGET").await;
    let vendor_a = seed_vendor(&state, "ACME").await;
    let vendor_b = seed_vendor(&state, "BOLTCO").await;

    state
        .purchasing
        .set_vendor_cost(vendor_a, widget.piece_id, 120, true)
        .await
        .unwrap();
    state
        .purchasing
        .set_vendor_cost(vendor_b, gadget.piece_id, 340, true)
        .await
        .unwrap();

    let created = state
        .purchasing
        .reorder_to_drafts(vec![
            ReorderItem {
                variant_id: widget.piece_id,
                suggested_qty: 10,
            },
            ReorderItem {
                variant_id: gadget.piece_id,
                suggested_qty: 5,
            },
        ])
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
    for po_id in &created {
        let po = state.purchasing.get_po(*po_id).await.unwrap();
        assert_eq!(po.status, PoStatus::Draft);
        let lines = state.purchasing.get_po_lines(*po_id).await.unwrap();
        assert_eq!(lines.len(), 1);
    }

    // One unsourceable variant fails the whole batch.
    let orphan = seed_piece_case_product(&state, "ORPHAN").await;
    let err = state
        .purchasing
        .reorder_to_drafts(vec![
            ReorderItem {
                variant_id: widget.piece_id,
                suggested_qty: 1,
            },
            ReorderItem {
                variant_id: orphan.piece_id,
                suggested_qty: 1,
            },
        ])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NoPreferredVendor(_));
}
