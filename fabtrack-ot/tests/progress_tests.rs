//! Integration tests for step transitions and unit progress projection
//!
//! These drive the transition controller and projector against a real
//! on-disk database, so sequence enforcement, the open-event guard, and
//! duration logging are verified end to end.

use sqlx::SqlitePool;
use tempfile::TempDir;

use fabtrack_common::db::init::init_database;
use fabtrack_common::Error;
use fabtrack_ot::db;
use fabtrack_ot::db::orders::NewOrderItem;
use fabtrack_ot::models::{StartStepRequest, StepStatus};
use fabtrack_ot::services::{ProgressProjector, TransitionController};

// ========================================
// Test Helpers
// ========================================

async fn setup_test_db() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("fabtrack.db");
    let pool = init_database(&db_path).await.unwrap();
    (dir, pool)
}

/// Seed one client and one order, returning (order_id, order_item_id)
async fn seed_item(pool: &SqlitePool, quantity: i64) -> (i64, i64) {
    let client = db::clients::create_client(pool, "Acme Industrial", None, None)
        .await
        .unwrap();
    let order = db::orders::create_order(
        pool,
        client.id,
        "ORD-1001",
        None,
        &[NewOrderItem {
            product_name: "Widget".to_string(),
            quantity,
        }],
    )
    .await
    .unwrap();
    (order.order.id, order.items[0].id)
}

fn request(item_id: i64, step_id: i64, unit: i64) -> StartStepRequest {
    StartStepRequest {
        id_order_item: item_id,
        id_step: step_id,
        unit_number: unit,
        scanned_by: None,
        barcode: None,
        notes: None,
    }
}

// ========================================
// Single Unit Transitions
// ========================================

#[tokio::test]
async fn test_start_then_complete_writes_duration_row() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 2).await;
    let controller = TransitionController::new(pool.clone());

    let event = controller.start_step(request(item_id, 1, 1)).await.unwrap();
    assert_eq!(event.step_id, 1);
    assert_eq!(event.unit_number, 1);
    assert!(event.completed_at.is_none());

    let completed = controller.complete_step(event.id).await.unwrap();
    assert_eq!(completed.id, event.id);
    assert!(completed.completed_at.is_some());

    let durations = db::durations::list_durations_for_item(&pool, item_id)
        .await
        .unwrap();
    assert_eq!(durations.len(), 1);
    assert_eq!(durations[0].step_id, 1);
    assert_eq!(durations[0].unit_number, 1);
    assert!(durations[0].duration_seconds >= 0);
}

#[tokio::test]
async fn test_start_conflicts_while_step_open() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 2).await;
    let controller = TransitionController::new(pool);

    controller.start_step(request(item_id, 1, 1)).await.unwrap();
    let err = controller
        .start_step(request(item_id, 1, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn test_start_requires_previous_step_completed() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 2).await;
    let controller = TransitionController::new(pool);

    let err = controller
        .start_step(request(item_id, 2, 1))
        .await
        .unwrap_err();

    match err {
        Error::PreconditionFailed(msg) => assert!(msg.contains("Cutting")),
        other => panic!("expected PreconditionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sequence_enforced_per_unit() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 2).await;
    let controller = TransitionController::new(pool);

    // Unit 1 finishes Cutting; unit 2 has not started it
    let event = controller.start_step(request(item_id, 1, 1)).await.unwrap();
    controller.complete_step(event.id).await.unwrap();

    assert!(controller.start_step(request(item_id, 2, 1)).await.is_ok());
    let err = controller
        .start_step(request(item_id, 2, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PreconditionFailed(_)));
}

#[tokio::test]
async fn test_complete_twice_reports_not_found() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 1).await;
    let controller = TransitionController::new(pool);

    let event = controller.start_step(request(item_id, 1, 1)).await.unwrap();
    controller.complete_step(event.id).await.unwrap();
    let err = controller.complete_step(event.id).await.unwrap_err();

    match err {
        Error::NotFound(msg) => assert!(msg.contains("already completed")),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_complete_unknown_progress_id() {
    let (_dir, pool) = setup_test_db().await;
    let controller = TransitionController::new(pool);

    let err = controller.complete_step(999).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_unit_number_bounds_checked() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 3).await;
    let controller = TransitionController::new(pool);

    for unit in [0, -1, 4] {
        let err = controller
            .start_step(request(item_id, 1, unit))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "unit {}", unit);
    }
}

#[tokio::test]
async fn test_start_unknown_item_or_step() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 1).await;
    let controller = TransitionController::new(pool);

    let err = controller
        .start_step(request(999, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = controller
        .start_step(request(item_id, 99, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_restart_after_completion_allowed() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 1).await;
    let controller = TransitionController::new(pool.clone());

    // Rework: a completed step may be run again for the same unit
    let event = controller.start_step(request(item_id, 1, 1)).await.unwrap();
    controller.complete_step(event.id).await.unwrap();
    let rework = controller.start_step(request(item_id, 1, 1)).await.unwrap();
    assert_ne!(rework.id, event.id);

    let views = ProgressProjector::new(pool).project(item_id).await.unwrap();
    assert_eq!(views[0].current_step_id, Some(1));
    assert_eq!(views[0].current_step_status, StepStatus::InProgress);
    assert_eq!(views[0].progress.len(), 2);
}

// ========================================
// Full Sequence
// ========================================

#[tokio::test]
async fn test_full_sequence_completes_unit() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 2).await;
    let controller = TransitionController::new(pool.clone());

    for step_id in 1..=6 {
        let event = controller
            .start_step(request(item_id, step_id, 1))
            .await
            .unwrap();
        controller.complete_step(event.id).await.unwrap();
    }

    let views = ProgressProjector::new(pool.clone())
        .project(item_id)
        .await
        .unwrap();

    assert_eq!(views.len(), 2);
    assert_eq!(views[0].current_step_status, StepStatus::Completed);
    assert_eq!(views[0].current_step_name.as_deref(), Some("Packaging"));
    assert_eq!(views[0].progress.len(), 6);
    assert!(views[0].progress.iter().all(|e| e.completed_at.is_some()));

    // Unit 2 never moved
    assert_eq!(views[1].current_step_status, StepStatus::NotStarted);
    assert_eq!(views[1].current_step_id, Some(1));
    assert!(views[1].progress.is_empty());

    let durations = db::durations::list_durations_for_item(&pool, item_id)
        .await
        .unwrap();
    assert_eq!(durations.len(), 6);
}

#[tokio::test]
async fn test_inactive_step_skipped_in_sequence() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 1).await;

    // Retire Welding from the catalog
    sqlx::query("UPDATE steps SET active = 0 WHERE id = ?")
        .bind(2_i64)
        .execute(&pool)
        .await
        .unwrap();

    let controller = TransitionController::new(pool.clone());
    let event = controller.start_step(request(item_id, 1, 1)).await.unwrap();
    controller.complete_step(event.id).await.unwrap();

    // Starting the retired step is rejected, Painting follows Cutting directly
    let err = controller
        .start_step(request(item_id, 2, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(controller.start_step(request(item_id, 3, 1)).await.is_ok());

    let views = ProgressProjector::new(pool).project(item_id).await.unwrap();
    assert_eq!(views[0].current_step_id, Some(3));
    assert_eq!(views[0].current_step_status, StepStatus::InProgress);
}

// ========================================
// Bulk Transitions
// ========================================

#[tokio::test]
async fn test_bulk_start_then_complete_all_units() {
    let (_dir, pool) = setup_test_db().await;
    let (order_id, item_id) = seed_item(&pool, 3).await;
    let controller = TransitionController::new(pool.clone());

    let outcome = controller
        .start_step_for_all_units(order_id, 1)
        .await
        .unwrap();
    assert_eq!(outcome.succeeded.len(), 3);
    assert!(outcome.failed.is_empty());

    let outcome = controller
        .complete_step_for_all_units(order_id, 1)
        .await
        .unwrap();
    assert_eq!(outcome.succeeded.len(), 3);
    assert!(outcome.failed.is_empty());
    assert!(outcome.succeeded.iter().all(|e| e.completed_at.is_some()));

    let durations = db::durations::list_durations_for_item(&pool, item_id)
        .await
        .unwrap();
    assert_eq!(durations.len(), 3);
}

#[tokio::test]
async fn test_bulk_start_skips_blocked_units() {
    let (_dir, pool) = setup_test_db().await;
    let (order_id, item_id) = seed_item(&pool, 3).await;
    let controller = TransitionController::new(pool);

    // Unit 2 is already mid-Cutting
    controller.start_step(request(item_id, 1, 2)).await.unwrap();

    let outcome = controller
        .start_step_for_all_units(order_id, 1)
        .await
        .unwrap();

    let started: Vec<i64> = outcome.succeeded.iter().map(|e| e.unit_number).collect();
    assert_eq!(started, vec![1, 3]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].unit_number, 2);
    assert!(outcome.failed[0].reason.contains("already in progress"));
}

#[tokio::test]
async fn test_bulk_complete_reports_unstarted_units() {
    let (_dir, pool) = setup_test_db().await;
    let (order_id, item_id) = seed_item(&pool, 3).await;
    let controller = TransitionController::new(pool);

    // Only unit 1 is running
    controller.start_step(request(item_id, 1, 1)).await.unwrap();

    let outcome = controller
        .complete_step_for_all_units(order_id, 1)
        .await
        .unwrap();

    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.succeeded[0].unit_number, 1);
    assert_eq!(outcome.failed.len(), 2);
    assert!(outcome
        .failed
        .iter()
        .all(|f| f.reason.contains("already completed")));
}

#[tokio::test]
async fn test_bulk_spans_every_item_of_the_order() {
    let (_dir, pool) = setup_test_db().await;
    let client = db::clients::create_client(&pool, "Acme Industrial", None, None)
        .await
        .unwrap();
    let order = db::orders::create_order(
        &pool,
        client.id,
        "ORD-1002",
        None,
        &[
            NewOrderItem {
                product_name: "Frame".to_string(),
                quantity: 2,
            },
            NewOrderItem {
                product_name: "Bracket".to_string(),
                quantity: 1,
            },
        ],
    )
    .await
    .unwrap();

    let controller = TransitionController::new(pool);
    let outcome = controller
        .start_step_for_all_units(order.order.id, 1)
        .await
        .unwrap();

    // 2 units of Frame plus 1 unit of Bracket
    assert_eq!(outcome.succeeded.len(), 3);
    assert!(outcome.failed.is_empty());
}

#[tokio::test]
async fn test_bulk_unknown_order_rejected() {
    let (_dir, pool) = setup_test_db().await;
    let controller = TransitionController::new(pool);

    let err = controller
        .start_step_for_all_units(999, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_bulk_unknown_step_rejected() {
    let (_dir, pool) = setup_test_db().await;
    let (order_id, _) = seed_item(&pool, 1).await;
    let controller = TransitionController::new(pool);

    let err = controller
        .complete_step_for_all_units(order_id, 99)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// ========================================
// Projection Against Stored Events
// ========================================

#[tokio::test]
async fn test_projection_prefers_logged_durations() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 1).await;
    let controller = TransitionController::new(pool.clone());

    let event = controller.start_step(request(item_id, 1, 1)).await.unwrap();
    controller.complete_step(event.id).await.unwrap();

    // Simulate a corrected duration entered after the fact
    sqlx::query("UPDATE duration_log SET duration_seconds = 75 WHERE order_item_id = ?")
        .bind(item_id)
        .execute(&pool)
        .await
        .unwrap();

    let views = ProgressProjector::new(pool).project(item_id).await.unwrap();
    assert_eq!(views[0].progress[0].duration_seconds, Some(75));
    assert_eq!(views[0].total_time_seconds, 75);
}

#[tokio::test]
async fn test_projection_unknown_item_rejected() {
    let (_dir, pool) = setup_test_db().await;

    let err = ProgressProjector::new(pool).project(999).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// ========================================
// Stored Event Lookup
// ========================================

#[tokio::test]
async fn test_event_lookup_round_trips_stored_fields() {
    let (_dir, pool) = setup_test_db().await;
    let (_, item_id) = seed_item(&pool, 1).await;
    let controller = TransitionController::new(pool.clone());

    let mut req = request(item_id, 1, 1);
    req.scanned_by = Some("line-a".to_string());
    req.barcode = Some("FT-0001".to_string());
    let started = controller.start_step(req).await.unwrap();

    let fetched = db::progress::get_event(&pool, started.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.id, started.id);
    assert_eq!(fetched.order_item_id, item_id);
    assert_eq!(fetched.step_id, 1);
    assert_eq!(fetched.unit_number, 1);
    assert_eq!(fetched.started_at, started.started_at);
    assert_eq!(fetched.scanned_by.as_deref(), Some("line-a"));
    assert_eq!(fetched.barcode.as_deref(), Some("FT-0001"));
    assert!(fetched.completed_at.is_none());

    let completed = controller.complete_step(started.id).await.unwrap();
    let fetched = db::progress::get_event(&pool, started.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.completed_at, completed.completed_at);

    assert!(db::progress::get_event(&pool, 999)
        .await
        .unwrap()
        .is_none());
}
