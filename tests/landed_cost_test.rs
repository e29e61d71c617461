//! Inbound shipment lifecycle, cost allocation, landed-cost snapshots.

mod common;

use assert_matches::assert_matches;

use common::{seed_piece_case_product, test_state};
use wms_api::entities::inbound_shipment::{AllocationMethod, ShipmentMode, ShipmentStatus};
use wms_api::entities::shipment_cost::CostType;
use wms_api::errors::ServiceError;
use wms_api::services::shipments::{CreateShipmentInput, ShipmentCostInput, ShipmentLineInput};
use wms_api::AppState;

fn shipment_input(mode: ShipmentMode) -> CreateShipmentInput {
    CreateShipmentInput {
        mode,
        carrier: Some("Evergreen".to_string()),
        forwarder: None,
        origin_port: Some("CNSHA".to_string()),
        destination_port: Some("USLAX".to_string()),
        container_number: None,
        bol_number: None,
        tracking_number: None,
        etd: None,
        eta: None,
        allocation_method_default: None,
    }
}

/// Two lines with identical cubic volume (50 x 20x20x25cm units each).
async fn seed_two_equal_volume_lines(state: &AppState, shipment_id: uuid::Uuid) {
    let a = seed_piece_case_product(state, "ALPHA").await;
    let b = seed_piece_case_product(state, "BRAVO").await;
    for variant_id in [a.piece_id, b.piece_id] {
        state
            .shipments
            .add_line(
                shipment_id,
                ShipmentLineInput {
                    po_line_id: None,
                    variant_id,
                    qty_shipped: 50,
                    unit_weight_grams: 400,
                    unit_length_mm: 200,
                    unit_width_mm: 200,
                    unit_height_mm: 250,
                    gross_volume_cm3: None,
                },
            )
            .await
            .expect("add line");
    }
}

#[tokio::test]
async fn odd_cent_freight_splits_with_remainder_on_first_equal_line() {
    let state = test_state().await;
    let shipment = state
        .shipments
        .create_shipment(shipment_input(ShipmentMode::SeaLcl))
        .await
        .unwrap();
    seed_two_equal_volume_lines(&state, shipment.id).await;

    state
        .shipments
        .add_cost(
            shipment.id,
            ShipmentCostInput {
                cost_type: CostType::Freight,
                estimated_cents: 10_001,
                actual_cents: None,
                allocation_method: None,
            },
        )
        .await
        .unwrap();

    state.shipments.run_allocation(shipment.id).await.unwrap();
    let allocations = state.shipments.get_allocations(shipment.id).await.unwrap();
    assert_eq!(allocations.len(), 2);
    let mut cents: Vec<i64> = allocations.iter().map(|a| a.allocated_cents).collect();
    assert_eq!(cents.iter().sum::<i64>(), 10_001);
    cents.sort();
    assert_eq!(cents, vec![5_000, 5_001]);
}

#[tokio::test]
async fn rerunning_allocation_is_deterministic() {
    let state = test_state().await;
    let shipment = state
        .shipments
        .create_shipment(shipment_input(ShipmentMode::SeaFcl))
        .await
        .unwrap();
    seed_two_equal_volume_lines(&state, shipment.id).await;
    state
        .shipments
        .add_cost(
            shipment.id,
            ShipmentCostInput {
                cost_type: CostType::Freight,
                estimated_cents: 34_567,
                actual_cents: None,
                allocation_method: None,
            },
        )
        .await
        .unwrap();

    state.shipments.run_allocation(shipment.id).await.unwrap();
    let mut first: Vec<(uuid::Uuid, i64)> = state
        .shipments
        .get_allocations(shipment.id)
        .await
        .unwrap()
        .into_iter()
        .map(|a| (a.shipment_line_id, a.allocated_cents))
        .collect();
    first.sort();

    state.shipments.run_allocation(shipment.id).await.unwrap();
    let mut second: Vec<(uuid::Uuid, i64)> = state
        .shipments
        .get_allocations(shipment.id)
        .await
        .unwrap()
        .into_iter()
        .map(|a| (a.shipment_line_id, a.allocated_cents))
        .collect();
    second.sort();

    assert_eq!(first, second);
}

#[tokio::test]
async fn duty_allocates_by_value_and_brokerage_per_line() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "CHAIR").await;
    let other = seed_piece_case_product(&state, "TABLE").await;

    // Build a PO so duty has line values to weigh by.
    let vendor = state
        .purchasing
        .create_vendor(wms_api::services::purchasing::CreateVendorInput {
            code: "IMPORTER".to_string(),
            name: "Importer".to_string(),
            contact_email: None,
            contact_phone: None,
            currency: "USD".to_string(),
            payment_terms: None,
        })
        .await
        .unwrap();
    let po = state
        .purchasing
        .create_po(wms_api::services::purchasing::CreatePoInput {
            vendor_id: vendor.id,
            warehouse_id: None,
            priority: None,
            expected_delivery_date: None,
            discount_cents: 0,
            tax_cents: 0,
            shipping_cents: 0,
            notes: None,
        })
        .await
        .unwrap();
    let cheap = state
        .purchasing
        .add_line(
            po.id,
            wms_api::services::purchasing::PoLineInput {
                variant_id: catalog.piece_id,
                unit_cost_cents: 100,
                order_qty: 10,
                discount_pct: 0,
                tax_pct: 0,
            },
        )
        .await
        .unwrap();
    let pricey = state
        .purchasing
        .add_line(
            po.id,
            wms_api::services::purchasing::PoLineInput {
                variant_id: other.piece_id,
                unit_cost_cents: 300,
                order_qty: 10,
                discount_pct: 0,
                tax_pct: 0,
            },
        )
        .await
        .unwrap();

    let shipment = state
        .shipments
        .create_shipment(shipment_input(ShipmentMode::Air))
        .await
        .unwrap();
    for (variant_id, po_line) in [(catalog.piece_id, &cheap), (other.piece_id, &pricey)] {
        state
            .shipments
            .add_line(
                shipment.id,
                ShipmentLineInput {
                    po_line_id: Some(po_line.id),
                    variant_id,
                    qty_shipped: 10,
                    unit_weight_grams: 1000,
                    unit_length_mm: 100,
                    unit_width_mm: 100,
                    unit_height_mm: 100,
                    gross_volume_cm3: None,
                },
            )
            .await
            .unwrap();
    }

    state
        .shipments
        .add_cost(
            shipment.id,
            ShipmentCostInput {
                cost_type: CostType::Duty,
                estimated_cents: 4_000,
                actual_cents: None,
                allocation_method: Some(AllocationMethod::ByWeight), // overridden
            },
        )
        .await
        .unwrap();
    state
        .shipments
        .add_cost(
            shipment.id,
            ShipmentCostInput {
                cost_type: CostType::Brokerage,
                estimated_cents: 500,
                actual_cents: None,
                allocation_method: None,
            },
        )
        .await
        .unwrap();

    state.shipments.run_allocation(shipment.id).await.unwrap();
    let lines = state.shipments.get_lines(shipment.id).await.unwrap();
    let cheap_line = lines.iter().find(|l| l.po_line_id == Some(cheap.id)).unwrap();
    let pricey_line = lines.iter().find(|l| l.po_line_id == Some(pricey.id)).unwrap();

    // Duty splits 1000/3000 by value; brokerage 250/250 per line.
    assert_eq!(cheap_line.allocated_cost_cents, 1_000 + 250);
    assert_eq!(pricey_line.allocated_cost_cents, 3_000 + 250);
}

#[tokio::test]
async fn finalize_writes_snapshots_and_unit_costs() {
    let state = test_state().await;
    let shipment = state
        .shipments
        .create_shipment(shipment_input(ShipmentMode::Ground))
        .await
        .unwrap();
    let catalog = seed_piece_case_product(&state, "LAMP").await;
    state
        .shipments
        .add_line(
            shipment.id,
            ShipmentLineInput {
                po_line_id: None,
                variant_id: catalog.piece_id,
                qty_shipped: 40,
                unit_weight_grams: 500,
                unit_length_mm: 100,
                unit_width_mm: 100,
                unit_height_mm: 100,
                gross_volume_cm3: None,
            },
        )
        .await
        .unwrap();
    state
        .shipments
        .add_cost(
            shipment.id,
            ShipmentCostInput {
                cost_type: CostType::Freight,
                estimated_cents: 2_000,
                actual_cents: Some(2_500),
                allocation_method: None,
            },
        )
        .await
        .unwrap();

    let snapshots = state.shipments.finalize(shipment.id).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    let snap = &snapshots[0];
    // No PO link: landed cost is pure allocation, actuals win.
    assert_eq!(snap.po_unit_cost_cents, 0);
    assert_eq!(snap.freight_cents, 2_500);
    assert_eq!(snap.total_landed_cents, 2_500);
    assert_eq!(snap.landed_unit_cost_cents, 63); // 62.5 rounds up
    assert_eq!(snap.qty, 40);

    let lines = state.shipments.get_lines(shipment.id).await.unwrap();
    assert_eq!(lines[0].landed_unit_cost_cents, Some(63));
}

#[tokio::test]
async fn booking_requires_lines_and_close_finalizes() {
    let state = test_state().await;
    let shipment = state
        .shipments
        .create_shipment(shipment_input(ShipmentMode::Parcel))
        .await
        .unwrap();

    let err = state
        .shipments
        .transition(shipment.id, ShipmentStatus::Booked)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));

    let catalog = seed_piece_case_product(&state, "MUG").await;
    state
        .shipments
        .add_line(
            shipment.id,
            ShipmentLineInput {
                po_line_id: None,
                variant_id: catalog.piece_id,
                qty_shipped: 5,
                unit_weight_grams: 300,
                unit_length_mm: 0,
                unit_width_mm: 0,
                unit_height_mm: 0,
                gross_volume_cm3: None,
            },
        )
        .await
        .unwrap();

    for status in [
        ShipmentStatus::Booked,
        ShipmentStatus::InTransit,
        ShipmentStatus::AtPort,
        ShipmentStatus::CustomsClearance,
        ShipmentStatus::Delivered,
        ShipmentStatus::Costing,
        ShipmentStatus::Closed,
    ] {
        state.shipments.transition(shipment.id, status).await.unwrap();
    }

    // Close ran finalization.
    let lines = state.shipments.get_lines(shipment.id).await.unwrap();
    assert!(lines[0].landed_unit_cost_cents.is_some());

    // Closed shipments refuse further finalization and cancellation.
    let err = state.shipments.finalize(shipment.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
    let err = state
        .shipments
        .transition(shipment.id, ShipmentStatus::Cancelled)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn skipping_states_is_rejected() {
    let state = test_state().await;
    let shipment = state
        .shipments
        .create_shipment(shipment_input(ShipmentMode::Air))
        .await
        .unwrap();
    let err = state
        .shipments
        .transition(shipment.id, ShipmentStatus::Delivered)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}
