//! Client database operations

use fabtrack_common::db::models::Client;
use fabtrack_common::Result;
use sqlx::{Row, SqlitePool};

/// Insert a new client and return it with its assigned id
pub async fn create_client(
    pool: &SqlitePool,
    name: &str,
    contact_email: Option<&str>,
    phone: Option<&str>,
) -> Result<Client> {
    let result = sqlx::query("INSERT INTO clients (name, contact_email, phone) VALUES (?, ?, ?)")
        .bind(name)
        .bind(contact_email)
        .bind(phone)
        .execute(pool)
        .await?;

    Ok(Client {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        contact_email: contact_email.map(String::from),
        phone: phone.map(String::from),
    })
}

/// List all clients ordered by name
pub async fn list_clients(pool: &SqlitePool) -> Result<Vec<Client>> {
    let rows = sqlx::query("SELECT id, name, contact_email, phone FROM clients ORDER BY name, id")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(client_from_row).collect())
}

/// Fetch one client by id
pub async fn get_client(pool: &SqlitePool, id: i64) -> Result<Option<Client>> {
    let row = sqlx::query("SELECT id, name, contact_email, phone FROM clients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(client_from_row))
}

/// Delete a client; cascades to its orders, items, progress, and durations
///
/// Returns true when a row was actually deleted.
pub async fn delete_client(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM clients WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn client_from_row(row: &sqlx::sqlite::SqliteRow) -> Client {
    Client {
        id: row.get("id"),
        name: row.get("name"),
        contact_email: row.get("contact_email"),
        phone: row.get("phone"),
    }
}
