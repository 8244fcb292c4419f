//! Database schema migrations
//!
//! Implements versioned schema migrations to allow seamless database upgrades
//! without requiring manual deletion or data loss.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - They must remain stable for users upgrading from older versions
//! 2. **Always add new migrations** - Create a new migration function for each schema change
//! 3. **Use ALTER TABLE** - Prefer ALTER TABLE over DROP/CREATE to preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

/// Set schema version in database
async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: Add scanner metadata columns to order_progress
///
/// **Background:** The order_progress table predates the barcode scanner
/// rollout; scanned_by and barcode arrived later. Databases created since
/// include both columns in the base schema, so this only touches old files.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: Add scanner metadata columns to order_progress");

    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='order_progress'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        info!("  order_progress table doesn't exist yet - skipping migration");
        return Ok(());
    }

    for column in ["scanned_by", "barcode"] {
        let has_column: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('order_progress') WHERE name = ?",
        )
        .bind(column)
        .fetch_one(pool)
        .await?;

        if has_column > 0 {
            info!("  {} column already exists - skipping", column);
            continue;
        }

        // Catch duplicate column error for concurrent initialization races
        let alter_sql = format!("ALTER TABLE order_progress ADD COLUMN {} TEXT", column);
        match sqlx::query(&alter_sql).execute(pool).await {
            Ok(_) => {
                info!("  ✓ Added {} column to order_progress table", column);
            }
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                info!("  {} column added by concurrent thread - skipping", column);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Migration v2: Backfill duration_log from completed progress events
///
/// **Background:** Early builds computed step durations on the fly from
/// order_progress timestamps. The denormalized duration_log table was added
/// for analytics; this migration backfills it so historical completions show
/// up in the per-step averages.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: Backfill duration_log from completed events");

    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='order_progress'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        info!("  order_progress table doesn't exist yet - skipping migration");
        return Ok(());
    }

    // Whole-second epoch subtraction truncates the same way the live
    // completion path does
    let result = sqlx::query(
        r#"
        INSERT INTO duration_log (order_item_id, step_id, unit_number, duration_seconds)
        SELECT p.order_item_id, p.step_id, p.unit_number,
               CAST(strftime('%s', p.completed_at) AS INTEGER) - CAST(strftime('%s', p.started_at) AS INTEGER)
        FROM order_progress p
        WHERE p.completed_at IS NOT NULL
          AND NOT EXISTS (
              SELECT 1 FROM duration_log d
              WHERE d.order_item_id = p.order_item_id
                AND d.step_id = p.step_id
                AND d.unit_number = p.unit_number
          )
        "#,
    )
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        info!("  ✓ Backfilled {} duration_log rows", result.rows_affected());
    } else {
        info!("  No completed events needed backfilling");
    }

    Ok(())
}
