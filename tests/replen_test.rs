//! Replenishment rules: firing condition, dedup, sourcing order, and
//! completion through the ledger.

mod common;

use common::{seed_piece_case_product, seed_warehouse, test_state};
use wms_api::entities::inventory_balance::StockState;
use wms_api::entities::location::LocationType;
use wms_api::entities::replen_rule::{ReplenMethod, SourcePriority};
use wms_api::entities::replen_task::ReplenTrigger;
use wms_api::services::inventory::TxnRefs;
use wms_api::services::replenishment::CreateRuleInput;
use wms_api::AppState;

fn rule_input(warehouse_id: uuid::Uuid, base: &str, method: ReplenMethod) -> CreateRuleInput {
    CreateRuleInput {
        pick_variant_sku: base.to_string(),
        source_variant_sku: format!("{base}-C12"),
        warehouse_id,
        pick_location_type: LocationType::ForwardPick,
        source_location_type: LocationType::BulkStorage,
        source_priority: None,
        min_qty: 10,
        max_qty: None,
        replen_method: method,
        priority: None,
    }
}

async fn stock_bulk_cases(state: &AppState, case_id: uuid::Uuid, bulk: uuid::Uuid, cases: i64) {
    state
        .inventory
        .receive(case_id, bulk, cases, TxnRefs::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn rule_fires_at_or_below_min_and_dedups_open_tasks() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "SNACK").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    stock_bulk_cases(&state, catalog.case_id, wh.bulk, 5).await;

    // Pick face at 5 pieces, min 10: the rule fires.
    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 5, TxnRefs::default())
        .await
        .unwrap();
    state
        .replenishment
        .create_rule(rule_input(wh.warehouse_id, "SNACK", ReplenMethod::CaseBreak))
        .await
        .unwrap();

    let tasks = state
        .replenishment
        .generate(ReplenTrigger::MinMax)
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].qty_source_units, 1);
    assert_eq!(tasks[0].qty_target_units, 12);

    // Generating again with the task still open adds nothing.
    let again = state
        .replenishment
        .generate(ReplenTrigger::MinMax)
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn rule_does_not_fire_above_min() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "CHIP").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    stock_bulk_cases(&state, catalog.case_id, wh.bulk, 5).await;

    state
        .inventory
        .receive(catalog.piece_id, wh.bin_a, 11, TxnRefs::default())
        .await
        .unwrap();
    state
        .replenishment
        .create_rule(rule_input(wh.warehouse_id, "CHIP", ReplenMethod::CaseBreak))
        .await
        .unwrap();

    let tasks = state
        .replenishment
        .generate(ReplenTrigger::MinMax)
        .await
        .unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn completing_a_case_break_posts_the_conversion() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "JUICE").await;
    let wh = seed_warehouse(&state, "MAIN").await;
    stock_bulk_cases(&state, catalog.case_id, wh.bulk, 4).await;

    state
        .replenishment
        .create_rule(rule_input(wh.warehouse_id, "JUICE", ReplenMethod::CaseBreak))
        .await
        .unwrap();
    let tasks = state
        .replenishment
        .generate(ReplenTrigger::MinMax)
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);

    let done = state
        .replenishment
        .complete_task(tasks[0].id, None)
        .await
        .unwrap();
    assert_eq!(done.qty_completed, 1);

    // One case left bulk; twelve pieces arrived at the pick face.
    assert_eq!(
        state
            .inventory
            .balance(catalog.case_id, wh.bulk, StockState::OnHand)
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        state
            .inventory
            .balance(catalog.piece_id, tasks[0].to_location_id, StockState::OnHand)
            .await
            .unwrap(),
        12
    );

    // With the task completed the rule may fire again if still short.
    let again = state
        .replenishment
        .generate(ReplenTrigger::MinMax)
        .await
        .unwrap();
    assert!(again.is_empty(), "pick face now above min");
}

#[tokio::test]
async fn full_case_moves_toward_max_and_respects_source_order() {
    let state = test_state().await;
    let catalog = seed_piece_case_product(&state, "MILK").await;
    let wh = seed_warehouse(&state, "MAIN").await;

    // Two bulk cells: a large one stocked first, then a small one.
    state
        .inventory
        .receive(catalog.case_id, wh.bulk, 10, TxnRefs::default())
        .await
        .unwrap();
    state
        .inventory
        .receive(catalog.case_id, wh.receiving_dock, 1, TxnRefs::default())
        .await
        .unwrap();
    // Move the dock stock into a second bulk bin via transfer to create a
    // smaller, younger cell.
    let second_bulk = state
        .locations
        .create_location(wms_api::services::locations::CreateLocationInput {
            warehouse_id: wh.warehouse_id,
            code: "BULK-02".to_string(),
            location_type: LocationType::BulkStorage,
            is_pickable: false,
            zone_sequence: 9,
        })
        .await
        .unwrap();
    state
        .inventory
        .transfer(catalog.case_id, wh.receiving_dock, second_bulk.id, 1, TxnRefs::default())
        .await
        .unwrap();

    let mut input = rule_input(wh.warehouse_id, "MILK", ReplenMethod::FullCase);
    input.max_qty = Some(36);
    input.source_priority = Some(SourcePriority::SmallestFirst);
    state.replenishment.create_rule(input).await.unwrap();

    let tasks = state
        .replenishment
        .generate(ReplenTrigger::MinMax)
        .await
        .unwrap();
    // Needs 36 base = 3 cases; smallest cell (1 case) drains first.
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].from_location_id, second_bulk.id);
    assert_eq!(tasks[0].qty_source_units, 1);
    assert_eq!(tasks[1].from_location_id, wh.bulk);
    assert_eq!(tasks[1].qty_source_units, 2);
}

#[tokio::test]
async fn csv_rule_import_warns_on_unresolvable_rows() {
    let state = test_state().await;
    let _catalog = seed_piece_case_product(&state, "TEA").await;
    let _wh = seed_warehouse(&state, "MAIN").await;

    let csv = "pick_sku,source_sku,warehouse,pick_location_type,source_location_type,min_qty,max_qty,replen_method\n\
               TEA,TEA-C12,MAIN,forward_pick,bulk_storage,10,24,case_break\n\
               NOPE,NOPE-C12,MAIN,forward_pick,bulk_storage,10,,full_case\n";
    let report = state.replenishment.import_rules_csv(csv).await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].message.contains("NOPE"));

    let rules = state.replenishment.list_rules().await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].min_qty, 10);
    assert_eq!(rules[0].max_qty, Some(24));
}
