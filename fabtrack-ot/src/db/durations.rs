//! Duration log database operations
//!
//! One row per completed step cycle, written in the same transaction that
//! stamps the progress event's completed_at. Duration aggregates read this
//! table rather than recomputing from event timestamps.

use fabtrack_common::db::models::DurationLogEntry;
use fabtrack_common::Result;
use sqlx::{Row, SqlitePool};

/// Record the whole-second duration of a completed step cycle
///
/// Runs on the caller's transaction so event completion and its duration
/// row commit or roll back together.
pub async fn insert_duration(
    conn: &mut sqlx::SqliteConnection,
    order_item_id: i64,
    step_id: i64,
    unit_number: i64,
    duration_seconds: i64,
) -> Result<DurationLogEntry> {
    let result = sqlx::query(
        r#"
        INSERT INTO duration_log (order_item_id, step_id, unit_number, duration_seconds)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(order_item_id)
    .bind(step_id)
    .bind(unit_number)
    .bind(duration_seconds)
    .execute(&mut *conn)
    .await?;

    Ok(DurationLogEntry {
        id: result.last_insert_rowid(),
        order_item_id,
        step_id,
        unit_number,
        duration_seconds,
    })
}

/// Every duration recorded for an order item, oldest first
pub async fn list_durations_for_item(
    pool: &SqlitePool,
    order_item_id: i64,
) -> Result<Vec<DurationLogEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, order_item_id, step_id, unit_number, duration_seconds
        FROM duration_log
        WHERE order_item_id = ?
        ORDER BY id
        "#,
    )
    .bind(order_item_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| DurationLogEntry {
            id: row.get("id"),
            order_item_id: row.get("order_item_id"),
            step_id: row.get("step_id"),
            unit_number: row.get("unit_number"),
            duration_seconds: row.get("duration_seconds"),
        })
        .collect())
}
