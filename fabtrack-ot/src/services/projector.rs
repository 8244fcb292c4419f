//! Unit progress projection
//!
//! Turns the append-only progress log into a per-unit status view. A unit
//! is an index `1..=quantity` of its order item, never a stored row, so the
//! view is recomputed from current log rows on every read. The computation
//! itself is a pure function over loaded data; `ProgressProjector` is the
//! thin loading wrapper the HTTP layer calls.
//!
//! Status derivation per unit, against the active step sequence:
//! - an open event (completed_at unset) puts the unit in_progress on that
//!   event's step;
//! - otherwise the first active step without a completed event is the
//!   unit's not_started current step;
//! - otherwise every active step has completed and the unit is completed,
//!   reported on the final step.

use std::collections::{HashMap, HashSet, VecDeque};

use sqlx::SqlitePool;

use fabtrack_common::db::models::{DurationLogEntry, ProgressEvent, Step};
use fabtrack_common::{Error, Result};

use crate::db;
use crate::models::{StepProgressEntry, StepStatus, UnitProgressView};

/// Project every unit of an order item from loaded rows
///
/// `steps` is the full catalog ordered by step_order (inactive steps are
/// kept for naming historical events, skipped for sequencing); `events`
/// arrive ordered by started_at then id; `durations` ordered by insertion.
/// Performs no I/O and no writes.
pub fn project_units(
    steps: &[Step],
    events: &[ProgressEvent],
    durations: &[DurationLogEntry],
    quantity: i64,
) -> Vec<UnitProgressView> {
    (1..=quantity)
        .map(|unit_number| project_unit(steps, events, durations, unit_number))
        .collect()
}

fn project_unit(
    steps: &[Step],
    events: &[ProgressEvent],
    durations: &[DurationLogEntry],
    unit_number: i64,
) -> UnitProgressView {
    let unit_events: Vec<&ProgressEvent> = events
        .iter()
        .filter(|e| e.unit_number == unit_number)
        .collect();

    // Logged durations are consumed oldest-first per step, so when a step
    // ran more than once for this unit each cycle keeps its own value.
    let mut logged: HashMap<i64, VecDeque<i64>> = HashMap::new();
    for entry in durations.iter().filter(|d| d.unit_number == unit_number) {
        logged
            .entry(entry.step_id)
            .or_default()
            .push_back(entry.duration_seconds);
    }

    let mut progress = Vec::with_capacity(unit_events.len());
    let mut total_time_seconds = 0;

    for event in &unit_events {
        // Prefer the duration log; event timestamps are the live fallback
        let duration_seconds = event.completed_at.map(|completed_at| {
            logged
                .get_mut(&event.step_id)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| (completed_at - event.started_at).num_seconds())
        });

        if let Some(seconds) = duration_seconds {
            total_time_seconds += seconds;
        }

        let (step_name, step_order) = match steps.iter().find(|s| s.id == event.step_id) {
            Some(step) => (step.name.clone(), step.step_order),
            None => (format!("step {}", event.step_id), 0),
        };

        progress.push(StepProgressEntry {
            step_id: event.step_id,
            step_name,
            step_order,
            started_at: event.started_at,
            completed_at: event.completed_at,
            duration_seconds,
        });
    }

    let active: Vec<&Step> = steps.iter().filter(|s| s.active).collect();
    let completed_step_ids: HashSet<i64> = unit_events
        .iter()
        .filter(|e| e.completed_at.is_some())
        .map(|e| e.step_id)
        .collect();

    // Most recently started open event wins when several exist
    let open_event = unit_events.iter().rev().find(|e| e.completed_at.is_none());

    let (current_step, current_step_status) = if let Some(event) = open_event {
        (
            steps.iter().find(|s| s.id == event.step_id),
            StepStatus::InProgress,
        )
    } else if let Some(next) = active
        .iter()
        .find(|s| !completed_step_ids.contains(&s.id))
        .copied()
    {
        (Some(next), StepStatus::NotStarted)
    } else {
        // Every active step completed; an empty catalog lands here too and
        // reports completion with no current step
        (active.last().copied(), StepStatus::Completed)
    };

    UnitProgressView {
        unit_number,
        current_step_id: current_step.map(|s| s.id),
        current_step_name: current_step.map(|s| s.name.clone()),
        current_step_status,
        progress,
        total_time_seconds,
    }
}

/// Loads an order item's rows and projects its units
pub struct ProgressProjector {
    db: SqlitePool,
}

impl ProgressProjector {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Project the current state of every unit of an order item
    ///
    /// Returns one view per unit number in `1..=quantity`.
    pub async fn project(&self, order_item_id: i64) -> Result<Vec<UnitProgressView>> {
        let item = db::orders::get_order_item(&self.db, order_item_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("order item {} not found", order_item_id)))?;

        let steps = db::steps::list_steps(&self.db).await?;
        let events = db::progress::list_events_for_item(&self.db, order_item_id).await?;
        let durations = db::durations::list_durations_for_item(&self.db, order_item_id).await?;

        Ok(project_units(&steps, &events, &durations, item.quantity))
    }
}
