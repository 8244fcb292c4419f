//! Progress event database operations
//!
//! The append-only log behind unit tracking. Only the transition controller
//! writes here; the projector and analytics read. An open event carries
//! completed_at = NULL, and the schema's partial unique index guarantees at
//! most one open event per (order_item_id, step_id, unit_number).

use chrono::{DateTime, Utc};
use fabtrack_common::db::models::ProgressEvent;
use fabtrack_common::{Error, Result};
use sqlx::{Row, SqlitePool};

use crate::utils::retry_on_lock;

/// Input for a new progress event; started_at is assigned at insert time
#[derive(Debug, Clone)]
pub struct NewProgressEvent {
    pub order_item_id: i64,
    pub step_id: i64,
    pub unit_number: i64,
    pub scanned_by: Option<String>,
    pub barcode: Option<String>,
    pub notes: Option<String>,
}

/// Insert an open progress event (started now, not yet completed)
///
/// A unique-index violation means another open event already exists for the
/// same unit and step, so racing starts receive the same Conflict the
/// controller's precondition check would have produced.
///
/// Uses retry_on_lock to handle transient database lock contention.
pub async fn insert_event(pool: &SqlitePool, new: &NewProgressEvent) -> Result<ProgressEvent> {
    let started_at = Utc::now();
    let started_at_str = started_at.to_rfc3339();

    // Get max lock wait time from settings (default 5000ms)
    let max_wait_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'ot_database_max_lock_wait_ms'",
    )
    .fetch_optional(pool)
    .await?
    .unwrap_or(5000);

    let id = retry_on_lock("insert progress event", max_wait_ms as u64, || async {
        let result = sqlx::query(
            r#"
            INSERT INTO order_progress (
                order_item_id, step_id, unit_number, started_at,
                scanned_by, barcode, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.order_item_id)
        .bind(new.step_id)
        .bind(new.unit_number)
        .bind(&started_at_str)
        .bind(&new.scanned_by)
        .bind(&new.barcode)
        .bind(&new.notes)
        .execute(pool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(Error::Conflict(format!(
                    "step {} already in progress for unit {}",
                    new.step_id, new.unit_number
                )))
            }
            Err(e) => Err(e.into()),
        }
    })
    .await?;

    Ok(ProgressEvent {
        id,
        order_item_id: new.order_item_id,
        step_id: new.step_id,
        unit_number: new.unit_number,
        started_at,
        completed_at: None,
        scanned_by: new.scanned_by.clone(),
        barcode: new.barcode.clone(),
        notes: new.notes.clone(),
    })
}

/// Find the open event for a unit and step, if one exists
pub async fn find_open_event(
    pool: &SqlitePool,
    order_item_id: i64,
    step_id: i64,
    unit_number: i64,
) -> Result<Option<ProgressEvent>> {
    let row = sqlx::query(
        r#"
        SELECT id, order_item_id, step_id, unit_number, started_at, completed_at,
               scanned_by, barcode, notes
        FROM order_progress
        WHERE order_item_id = ? AND step_id = ? AND unit_number = ?
          AND completed_at IS NULL
        "#,
    )
    .bind(order_item_id)
    .bind(step_id)
    .bind(unit_number)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(event_from_row).transpose()
}

/// Whether the unit has at least one completed event for the step
pub async fn has_completed_event(
    pool: &SqlitePool,
    order_item_id: i64,
    step_id: i64,
    unit_number: i64,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM order_progress
        WHERE order_item_id = ? AND step_id = ? AND unit_number = ?
          AND completed_at IS NOT NULL
        "#,
    )
    .bind(order_item_id)
    .bind(step_id)
    .bind(unit_number)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Mark an open event completed; returns None when the event is missing or
/// already completed
pub async fn complete_event(
    conn: &mut sqlx::SqliteConnection,
    id: i64,
    completed_at: DateTime<Utc>,
) -> Result<Option<ProgressEvent>> {
    let updated = sqlx::query(
        "UPDATE order_progress SET completed_at = ? WHERE id = ? AND completed_at IS NULL",
    )
    .bind(completed_at.to_rfc3339())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Ok(None);
    }

    let row = sqlx::query(
        r#"
        SELECT id, order_item_id, step_id, unit_number, started_at, completed_at,
               scanned_by, barcode, notes
        FROM order_progress
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Some(event_from_row(&row)?))
}

/// Every event of an order item, oldest first
pub async fn list_events_for_item(
    pool: &SqlitePool,
    order_item_id: i64,
) -> Result<Vec<ProgressEvent>> {
    let rows = sqlx::query(
        r#"
        SELECT id, order_item_id, step_id, unit_number, started_at, completed_at,
               scanned_by, barcode, notes
        FROM order_progress
        WHERE order_item_id = ?
        ORDER BY started_at, id
        "#,
    )
    .bind(order_item_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(event_from_row).collect()
}

/// Fetch one event by id
pub async fn get_event(pool: &SqlitePool, id: i64) -> Result<Option<ProgressEvent>> {
    let row = sqlx::query(
        r#"
        SELECT id, order_item_id, step_id, unit_number, started_at, completed_at,
               scanned_by, barcode, notes
        FROM order_progress
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(event_from_row).transpose()
}

fn event_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProgressEvent> {
    let started_at: String = row.get("started_at");
    let started_at = DateTime::parse_from_rfc3339(&started_at)
        .map_err(|e| Error::Internal(format!("Failed to parse started_at: {}", e)))?
        .with_timezone(&Utc);

    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at
        .map(|s| DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse completed_at: {}", e)))?
        .map(|dt| dt.with_timezone(&Utc));

    Ok(ProgressEvent {
        id: row.get("id"),
        order_item_id: row.get("order_item_id"),
        step_id: row.get("step_id"),
        unit_number: row.get("unit_number"),
        started_at,
        completed_at,
        scanned_by: row.get("scanned_by"),
        barcode: row.get("barcode"),
        notes: row.get("notes"),
    })
}
