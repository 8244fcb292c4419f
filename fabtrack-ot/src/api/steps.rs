//! Step catalog endpoint

use axum::{extract::State, Json};
use fabtrack_common::db::models::Step;

use crate::db;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/steps
///
/// The active assembly sequence, ordered. Clients drive scanner UIs and
/// dashboards from this list.
pub async fn list_steps(State(state): State<AppState>) -> ApiResult<Json<Vec<Step>>> {
    let steps = db::steps::list_active_steps(&state.db).await?;
    Ok(Json(steps))
}
