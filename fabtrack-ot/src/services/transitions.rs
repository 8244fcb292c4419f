//! Step transition control
//!
//! The only writer of the progress and duration logs. Start transitions
//! enforce the sequencing invariants; complete transitions stamp the event
//! and record its duration atomically. Bulk variants fan the single-unit
//! operations across every unit of an order, collecting per-unit failures
//! instead of aborting the batch.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use fabtrack_common::db::models::ProgressEvent;
use fabtrack_common::{Error, Result};

use crate::db;
use crate::db::progress::NewProgressEvent;
use crate::models::{BulkOutcome, StartStepRequest, UnitFailure};

pub struct TransitionController {
    db: SqlitePool,
}

impl TransitionController {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Start a step for one unit
    ///
    /// Preconditions, in order:
    /// - the order item and step must exist, the step must be active, and
    ///   unit_number must fall in `1..=quantity`;
    /// - no open event may exist for (item, step, unit), else Conflict. This
    ///   check is an optimistic fast-fail; the partial unique index makes
    ///   the insert itself the authoritative arbiter under races;
    /// - the immediately preceding active step must have completed for the
    ///   same unit, else PreconditionFailed.
    pub async fn start_step(&self, request: StartStepRequest) -> Result<ProgressEvent> {
        let item = db::orders::get_order_item(&self.db, request.id_order_item)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("order item {} not found", request.id_order_item))
            })?;

        if request.unit_number < 1 || request.unit_number > item.quantity {
            return Err(Error::InvalidInput(format!(
                "unit_number {} out of range 1..={} for order item {}",
                request.unit_number, item.quantity, item.id
            )));
        }

        let step = db::steps::get_step(&self.db, request.id_step)
            .await?
            .ok_or_else(|| Error::NotFound(format!("step {} not found", request.id_step)))?;

        if !step.active {
            return Err(Error::InvalidInput(format!(
                "step '{}' is not active",
                step.name
            )));
        }

        if db::progress::find_open_event(&self.db, item.id, step.id, request.unit_number)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(format!(
                "step {} already in progress for unit {}",
                step.id, request.unit_number
            )));
        }

        let active_steps = db::steps::list_active_steps(&self.db).await?;
        let previous = active_steps
            .iter()
            .filter(|s| s.step_order < step.step_order)
            .last();

        if let Some(previous) = previous {
            let previous_done =
                db::progress::has_completed_event(&self.db, item.id, previous.id, request.unit_number)
                    .await?;
            if !previous_done {
                return Err(Error::PreconditionFailed(format!(
                    "previous step '{}' must be completed first for unit {}",
                    previous.name, request.unit_number
                )));
            }
        }

        let event = db::progress::insert_event(
            &self.db,
            &NewProgressEvent {
                order_item_id: item.id,
                step_id: step.id,
                unit_number: request.unit_number,
                scanned_by: request.scanned_by,
                barcode: request.barcode,
                notes: request.notes,
            },
        )
        .await?;

        info!(
            event_id = event.id,
            order_item_id = item.id,
            step_id = step.id,
            unit_number = event.unit_number,
            "Step started"
        );

        Ok(event)
    }

    /// Complete an open progress event
    ///
    /// Stamps completed_at and inserts the duration row in one transaction;
    /// a missing or already-completed event fails with NotFound. Durations
    /// truncate toward zero to whole seconds.
    pub async fn complete_step(&self, id_progress: i64) -> Result<ProgressEvent> {
        let completed_at = Utc::now();

        let mut tx = self.db.begin().await?;

        let event = db::progress::complete_event(&mut tx, id_progress, completed_at)
            .await?
            .ok_or_else(|| Error::NotFound("step not found or already completed".to_string()))?;

        let duration_seconds = (completed_at - event.started_at).num_seconds();

        db::durations::insert_duration(
            &mut tx,
            event.order_item_id,
            event.step_id,
            event.unit_number,
            duration_seconds,
        )
        .await?;

        tx.commit().await?;

        info!(
            event_id = event.id,
            order_item_id = event.order_item_id,
            step_id = event.step_id,
            unit_number = event.unit_number,
            duration_seconds,
            "Step completed"
        );

        Ok(event)
    }

    /// Start a step on every unit of every item of an order
    ///
    /// Best-effort batch: per-unit domain failures (Conflict,
    /// PreconditionFailed, out-of-range) are collected in the outcome and
    /// never abort the remaining units. Storage failures do abort.
    pub async fn start_step_for_all_units(
        &self,
        order_id: i64,
        step_id: i64,
    ) -> Result<BulkOutcome> {
        let order = db::orders::get_order(&self.db, order_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("order {} not found", order_id)))?;

        let step = db::steps::get_step(&self.db, step_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("step {} not found", step_id)))?;
        if !step.active {
            return Err(Error::InvalidInput(format!(
                "step '{}' is not active",
                step.name
            )));
        }

        let mut outcome = BulkOutcome::new();

        for item in &order.items {
            for unit_number in 1..=item.quantity {
                let request = StartStepRequest {
                    id_order_item: item.id,
                    id_step: step_id,
                    unit_number,
                    scanned_by: None,
                    barcode: None,
                    notes: None,
                };

                match self.start_step(request).await {
                    Ok(event) => outcome.succeeded.push(event),
                    Err(err) => record_unit_failure(&mut outcome, item.id, unit_number, err)?,
                }
            }
        }

        info!(
            order_id,
            step_id,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Bulk step start finished"
        );

        Ok(outcome)
    }

    /// Complete a step on every unit of every item of an order
    ///
    /// Resolves each unit's open event for the step; units without one fail
    /// with the NotFound reason and the batch continues.
    pub async fn complete_step_for_all_units(
        &self,
        order_id: i64,
        step_id: i64,
    ) -> Result<BulkOutcome> {
        let order = db::orders::get_order(&self.db, order_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("order {} not found", order_id)))?;

        db::steps::get_step(&self.db, step_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("step {} not found", step_id)))?;

        let mut outcome = BulkOutcome::new();

        for item in &order.items {
            for unit_number in 1..=item.quantity {
                let open =
                    db::progress::find_open_event(&self.db, item.id, step_id, unit_number).await?;

                let result = match open {
                    Some(event) => self.complete_step(event.id).await,
                    None => Err(Error::NotFound(
                        "step not found or already completed".to_string(),
                    )),
                };

                match result {
                    Ok(event) => outcome.succeeded.push(event),
                    Err(err) => record_unit_failure(&mut outcome, item.id, unit_number, err)?,
                }
            }
        }

        info!(
            order_id,
            step_id,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Bulk step completion finished"
        );

        Ok(outcome)
    }
}

/// Collect a domain failure into the outcome; storage and internal errors
/// propagate and abort the batch
fn record_unit_failure(
    outcome: &mut BulkOutcome,
    order_item_id: i64,
    unit_number: i64,
    err: Error,
) -> Result<()> {
    match err {
        Error::Conflict(_)
        | Error::PreconditionFailed(_)
        | Error::NotFound(_)
        | Error::InvalidInput(_) => {
            debug!(
                order_item_id,
                unit_number,
                reason = %err,
                "Unit skipped during bulk transition"
            );
            outcome.failed.push(UnitFailure {
                order_item_id,
                unit_number,
                reason: err.to_string(),
            });
            Ok(())
        }
        other => Err(other),
    }
}
