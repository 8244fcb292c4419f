//! Order and order-item database operations
//!
//! Order creation is transactional: the order row and all of its item rows
//! insert atomically, so a failed item insert leaves no partial order behind.

use fabtrack_common::db::models::{Order, OrderItem};
use fabtrack_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::pagination::{calculate_pagination, Pagination, PAGE_SIZE};

/// Item payload for order creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_name: String,
    pub quantity: i64,
}

/// An order joined with its line items
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Create an order with all of its items in a single transaction
///
/// The client must exist and every item quantity must be at least 1; any
/// rejected item aborts the whole creation.
pub async fn create_order(
    pool: &SqlitePool,
    client_id: i64,
    reference: &str,
    notes: Option<&str>,
    items: &[NewOrderItem],
) -> Result<OrderWithItems> {
    if items.is_empty() {
        return Err(Error::InvalidInput(
            "order must contain at least one item".to_string(),
        ));
    }
    for item in items {
        if item.quantity < 1 {
            return Err(Error::InvalidInput(format!(
                "item '{}' has quantity {}, must be at least 1",
                item.product_name, item.quantity
            )));
        }
    }

    let client_exists = sqlx::query("SELECT id FROM clients WHERE id = ?")
        .bind(client_id)
        .fetch_optional(pool)
        .await?
        .is_some();
    if !client_exists {
        return Err(Error::NotFound(format!("client {} not found", client_id)));
    }

    let mut tx = pool.begin().await?;

    let order_id = sqlx::query("INSERT INTO orders (client_id, reference, notes) VALUES (?, ?, ?)")
        .bind(client_id)
        .bind(reference)
        .bind(notes)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    let mut inserted = Vec::with_capacity(items.len());
    for item in items {
        let item_id = sqlx::query(
            "INSERT INTO order_items (order_id, product_name, quantity) VALUES (?, ?, ?)",
        )
        .bind(order_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        inserted.push(OrderItem {
            id: item_id,
            order_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
        });
    }

    tx.commit().await?;

    Ok(OrderWithItems {
        order: Order {
            id: order_id,
            client_id,
            reference: reference.to_string(),
            notes: notes.map(String::from),
        },
        items: inserted,
    })
}

/// List orders newest-first, one page at a time
pub async fn list_orders(pool: &SqlitePool, page: i64) -> Result<(Vec<Order>, Pagination)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;

    let pagination = calculate_pagination(total, page);

    let rows = sqlx::query(
        "SELECT id, client_id, reference, notes FROM orders ORDER BY id DESC LIMIT ? OFFSET ?",
    )
    .bind(PAGE_SIZE)
    .bind(pagination.offset)
    .fetch_all(pool)
    .await?;

    Ok((rows.iter().map(order_from_row).collect(), pagination))
}

/// Fetch one order with its items
pub async fn get_order(pool: &SqlitePool, id: i64) -> Result<Option<OrderWithItems>> {
    let row = sqlx::query("SELECT id, client_id, reference, notes FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let order = match row {
        Some(ref row) => order_from_row(row),
        None => return Ok(None),
    };

    let items = list_items_for_order(pool, id).await?;

    Ok(Some(OrderWithItems { order, items }))
}

/// Delete an order; cascades wipe its items, progress events, and durations
///
/// Returns true when a row was actually deleted.
pub async fn delete_order(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetch one order item by id
pub async fn get_order_item(pool: &SqlitePool, id: i64) -> Result<Option<OrderItem>> {
    let row =
        sqlx::query("SELECT id, order_id, product_name, quantity FROM order_items WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row.as_ref().map(item_from_row))
}

/// Fetch every item of an order, in insertion order
pub async fn list_items_for_order(pool: &SqlitePool, order_id: i64) -> Result<Vec<OrderItem>> {
    let rows = sqlx::query(
        "SELECT id, order_id, product_name, quantity FROM order_items WHERE order_id = ? ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(item_from_row).collect())
}

fn order_from_row(row: &sqlx::sqlite::SqliteRow) -> Order {
    Order {
        id: row.get("id"),
        client_id: row.get("client_id"),
        reference: row.get("reference"),
        notes: row.get("notes"),
    }
}

fn item_from_row(row: &sqlx::sqlite::SqliteRow) -> OrderItem {
    OrderItem {
        id: row.get("id"),
        order_id: row.get("order_id"),
        product_name: row.get("product_name"),
        quantity: row.get("quantity"),
    }
}
