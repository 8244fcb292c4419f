//! Unit progress endpoints: projection reads and step transitions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use fabtrack_common::db::models::ProgressEvent;

use crate::error::ApiResult;
use crate::models::{BulkOutcome, CompleteStepRequest, StartStepRequest, UnitProgressView};
use crate::services::{ProgressProjector, TransitionController};
use crate::AppState;

/// GET /api/order-items/:id/progress
///
/// Projects every unit of the order item from the progress log. One view
/// per unit number in 1..=quantity.
pub async fn get_unit_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<UnitProgressView>>> {
    let views = ProgressProjector::new(state.db.clone()).project(id).await?;
    Ok(Json(views))
}

/// POST /api/progress/start
///
/// Starts a step for one unit. Fails with 409 when the step is already
/// open for the unit and 412 when the previous step has not completed.
pub async fn start_step(
    State(state): State<AppState>,
    Json(request): Json<StartStepRequest>,
) -> ApiResult<(StatusCode, Json<ProgressEvent>)> {
    let event = TransitionController::new(state.db.clone())
        .start_step(request)
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// POST /api/progress/complete
///
/// Completes an open progress event and records its duration. Fails with
/// 404 when the event is missing or already completed.
pub async fn complete_step(
    State(state): State<AppState>,
    Json(request): Json<CompleteStepRequest>,
) -> ApiResult<Json<ProgressEvent>> {
    let event = TransitionController::new(state.db.clone())
        .complete_step(request.id_progress)
        .await?;

    Ok(Json(event))
}

/// POST /api/orders/:id/steps/:step_id/start-all
///
/// Starts the step on every unit of every item of the order, best-effort.
pub async fn start_step_for_all_units(
    State(state): State<AppState>,
    Path((order_id, step_id)): Path<(i64, i64)>,
) -> ApiResult<Json<BulkOutcome>> {
    let outcome = TransitionController::new(state.db.clone())
        .start_step_for_all_units(order_id, step_id)
        .await?;

    Ok(Json(outcome))
}

/// POST /api/orders/:id/steps/:step_id/complete-all
///
/// Completes the step's open events across the whole order, best-effort.
pub async fn complete_step_for_all_units(
    State(state): State<AppState>,
    Path((order_id, step_id)): Path<(i64, i64)>,
) -> ApiResult<Json<BulkOutcome>> {
    let outcome = TransitionController::new(state.db.clone())
        .complete_step_for_all_units(order_id, step_id)
        .await?;

    Ok(Json(outcome))
}
