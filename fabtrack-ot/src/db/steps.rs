//! Step catalog queries
//!
//! The catalog is seeded at database initialization and read-only at
//! runtime. Ordering always follows `step_order`, never insertion order.

use fabtrack_common::db::models::Step;
use fabtrack_common::Result;
use sqlx::{Row, SqlitePool};

/// Fetch all active steps ordered by their position in the assembly sequence
pub async fn list_active_steps(pool: &SqlitePool) -> Result<Vec<Step>> {
    let rows = sqlx::query(
        "SELECT id, name, step_order, active FROM steps WHERE active = 1 ORDER BY step_order",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(step_from_row).collect())
}

/// Fetch the full catalog, inactive steps included, ordered by sequence
///
/// Projection joins event history against this list so events recorded
/// before a step was deactivated still resolve to a name.
pub async fn list_steps(pool: &SqlitePool) -> Result<Vec<Step>> {
    let rows = sqlx::query("SELECT id, name, step_order, active FROM steps ORDER BY step_order")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(step_from_row).collect())
}

/// Fetch one step by id (active or not)
pub async fn get_step(pool: &SqlitePool, id: i64) -> Result<Option<Step>> {
    let row = sqlx::query("SELECT id, name, step_order, active FROM steps WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(step_from_row))
}

fn step_from_row(row: &sqlx::sqlite::SqliteRow) -> Step {
    Step {
        id: row.get("id"),
        name: row.get("name"),
        step_order: row.get("step_order"),
        active: row.get::<i64, _>("active") != 0,
    }
}
