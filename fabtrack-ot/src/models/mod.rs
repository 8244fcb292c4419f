//! View and request models for the Order Tracking service
//!
//! These types shape what crosses the HTTP boundary: projected per-unit
//! progress views, step transition requests, and bulk operation outcomes.
//! Persistent row models live in `fabtrack_common::db::models`.

use chrono::{DateTime, Utc};
use fabtrack_common::db::models::ProgressEvent;
use serde::{Deserialize, Serialize};

/// Status of a unit's current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// No event recorded yet for the step the unit is waiting on
    NotStarted,
    /// An open event exists (started, not completed)
    InProgress,
    /// Every active step has a completed event for this unit
    Completed,
}

/// One recorded step event in a unit's history, joined with catalog data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepProgressEntry {
    pub step_id: i64,
    pub step_name: String,
    pub step_order: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Whole seconds spent on the step; `None` while the step is running
    pub duration_seconds: Option<i64>,
}

/// Projected state of one physical unit
///
/// Derived on read from the progress log against the active step catalog.
/// `current_step_id` is `None` only when the catalog has no active steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitProgressView {
    pub unit_number: i64,
    pub current_step_id: Option<i64>,
    pub current_step_name: Option<String>,
    pub current_step_status: StepStatus,
    pub progress: Vec<StepProgressEntry>,
    /// Sum of all known step durations for this unit, in whole seconds
    pub total_time_seconds: i64,
}

/// Request body for starting a step on one unit
#[derive(Debug, Clone, Deserialize)]
pub struct StartStepRequest {
    pub id_order_item: i64,
    pub id_step: i64,
    pub unit_number: i64,
    pub scanned_by: Option<String>,
    pub barcode: Option<String>,
    pub notes: Option<String>,
}

/// Request body for completing a previously started step event
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteStepRequest {
    pub id_progress: i64,
}

/// Why one unit was skipped during a bulk transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFailure {
    pub order_item_id: i64,
    pub unit_number: i64,
    pub reason: String,
}

/// Result of a bulk start/complete across every unit of an order
///
/// Bulk transitions are not atomic: units that pass proceed, units that
/// fail are reported here and never abort the batch.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub succeeded: Vec<ProgressEvent>,
    pub failed: Vec<UnitFailure>,
}

impl BulkOutcome {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl Default for BulkOutcome {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-step aggregate over the duration log
#[derive(Debug, Clone, Serialize)]
pub struct StepAnalyticsRow {
    pub step_id: i64,
    pub step_name: String,
    pub avg_duration_seconds: f64,
    pub min_duration_seconds: i64,
    pub max_duration_seconds: i64,
    pub completed_count: i64,
}

/// One time bucket of start/complete activity for a step
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelineBucket {
    /// Bucket label: `YYYY-MM-DD HH:00` for hourly tiers, `YYYY-MM-DD` for daily
    pub date_bucket: String,
    pub started_count: i64,
    pub completed_count: i64,
}
