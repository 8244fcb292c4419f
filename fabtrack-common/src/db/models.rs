//! Database models shared across FabTrack services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer placing manufacturing orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
}

/// A manufacturing order, owned by one client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub client_id: i64,
    pub reference: String,
    pub notes: Option<String>,
}

/// One line item of an order
///
/// `quantity` defines how many physical units exist for this item; units are
/// addressed as `1..=quantity` and never persisted as rows of their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_name: String,
    pub quantity: i64,
}

/// One stage of the fixed assembly sequence
///
/// `step_order` (1..N, strictly increasing) defines the sequence; every unit
/// must pass through every active step in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: i64,
    pub name: String,
    pub step_order: i64,
    pub active: bool,
}

/// One start/complete attempt of a step for a unit (append-only log row)
///
/// `completed_at == None` means the step is still running for that unit. At
/// most one open row may exist per (order_item_id, step_id, unit_number);
/// the partial unique index in the schema enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub id: i64,
    pub order_item_id: i64,
    pub step_id: i64,
    pub unit_number: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub scanned_by: Option<String>,
    pub barcode: Option<String>,
    pub notes: Option<String>,
}

/// Denormalized completed-step timing record
///
/// Written in the same transaction that completes a progress event; the
/// canonical duration source for analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationLogEntry {
    pub id: i64,
    pub order_item_id: i64,
    pub step_id: i64,
    pub unit_number: i64,
    pub duration_seconds: i64,
}
