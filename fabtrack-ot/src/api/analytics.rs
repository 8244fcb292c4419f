//! Step analytics endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::models::{StepAnalyticsRow, TimelineBucket};
use crate::services::StepAnalytics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TimelineParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// GET /api/analytics/steps
///
/// Per-step duration aggregates over all recorded completions.
pub async fn step_analytics(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<StepAnalyticsRow>>> {
    let rows = StepAnalytics::new(state.db.clone()).step_analytics().await?;
    Ok(Json(rows))
}

/// GET /api/analytics/steps/:id/timeline?start=&end=
///
/// Bucketed start/complete counts for one step. Bounds are RFC 3339
/// timestamps; both are optional.
pub async fn step_timeline(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<TimelineParams>,
) -> ApiResult<Json<Vec<TimelineBucket>>> {
    let start = parse_bound("start", params.start.as_deref())?;
    let end = parse_bound("end", params.end.as_deref())?;

    let buckets = StepAnalytics::new(state.db.clone())
        .step_timeline(id, start, end)
        .await?;

    Ok(Json(buckets))
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| ApiError::BadRequest(format!("invalid {} timestamp: {}", name, e)))
        })
        .transpose()
}
