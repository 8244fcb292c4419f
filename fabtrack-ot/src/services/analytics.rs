//! Step duration analytics
//!
//! Aggregates the duration log per step and buckets start/complete activity
//! over time. Reads only; the duration log is the canonical source for
//! completed timings, so nothing here recomputes from event timestamps.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};

use fabtrack_common::{Error, Result};

use crate::db;
use crate::models::{StepAnalyticsRow, TimelineBucket};

const HOUR_SECONDS: i64 = 3_600;
const DAY_SECONDS: i64 = 86_400;

/// Bucket label format for hourly tiers
const HOURLY_FORMAT: &str = "%Y-%m-%d %H:00";
/// Bucket label format for daily tiers
const DAILY_FORMAT: &str = "%Y-%m-%d";

pub struct StepAnalytics {
    db: SqlitePool,
}

impl StepAnalytics {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Average, min, and max completed durations per active step
    ///
    /// Steps with zero completions report zeroes, never null, so dashboards
    /// always render a full row per step.
    pub async fn step_analytics(&self) -> Result<Vec<StepAnalyticsRow>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id AS step_id,
                   s.name AS step_name,
                   COALESCE(AVG(d.duration_seconds), 0.0) AS avg_duration_seconds,
                   COALESCE(MIN(d.duration_seconds), 0) AS min_duration_seconds,
                   COALESCE(MAX(d.duration_seconds), 0) AS max_duration_seconds,
                   COUNT(d.id) AS completed_count
            FROM steps s
            LEFT JOIN duration_log d ON d.step_id = s.id
            WHERE s.active = 1
            GROUP BY s.id, s.name
            ORDER BY s.step_order
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StepAnalyticsRow {
                step_id: row.get("step_id"),
                step_name: row.get("step_name"),
                avg_duration_seconds: row.get("avg_duration_seconds"),
                min_duration_seconds: row.get("min_duration_seconds"),
                max_duration_seconds: row.get("max_duration_seconds"),
                completed_count: row.get("completed_count"),
            })
            .collect())
    }

    /// Time-bucketed start/complete counts for one step
    ///
    /// Bucket width follows the requested range: up to one day is hourly,
    /// up to seven days is daily, anything longer collapses to daily over
    /// the trailing 30 days ending at `end`. An absent range means the last
    /// 30 days ending now. Buckets with no activity are zero-filled.
    pub async fn step_timeline(
        &self,
        step_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<TimelineBucket>> {
        db::steps::get_step(&self.db, step_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("step {} not found", step_id)))?;

        let (start, end, bucket_seconds, format) = resolve_window(start, end, Utc::now())?;

        let started = self
            .bucket_counts("started_at", step_id, start, end, format)
            .await?;
        let completed = self
            .bucket_counts("completed_at", step_id, start, end, format)
            .await?;

        Ok(bucket_labels(start, end, bucket_seconds, format)
            .into_iter()
            .map(|label| TimelineBucket {
                started_count: started.get(&label).copied().unwrap_or(0),
                completed_count: completed.get(&label).copied().unwrap_or(0),
                date_bucket: label,
            })
            .collect())
    }

    async fn bucket_counts(
        &self,
        column: &str,
        step_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        format: &str,
    ) -> Result<HashMap<String, i64>> {
        // column is one of two fixed identifiers, never caller input
        let sql = format!(
            "SELECT strftime(?1, {column}) AS bucket, COUNT(*) AS n
             FROM order_progress
             WHERE step_id = ?2 AND {column} >= ?3 AND {column} <= ?4
             GROUP BY bucket"
        );

        let rows = sqlx::query(&sql)
            .bind(format)
            .bind(step_id)
            .bind(start.to_rfc3339())
            .bind(end.to_rfc3339())
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<String, _>("bucket"), row.get::<i64, _>("n")))
            .collect())
    }
}

/// Resolve the requested window into concrete bounds, bucket width, and
/// label format, applying the three-tier policy
fn resolve_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>, i64, &'static str)> {
    let end = end.unwrap_or(now);
    let mut start = start.unwrap_or(end - Duration::days(30));

    if start > end {
        return Err(Error::InvalidInput(
            "start must not be after end".to_string(),
        ));
    }

    let range = end - start;
    let (bucket_seconds, format) = if range <= Duration::days(1) {
        (HOUR_SECONDS, HOURLY_FORMAT)
    } else if range <= Duration::days(7) {
        (DAY_SECONDS, DAILY_FORMAT)
    } else {
        // Long ranges collapse to the trailing 30 days
        start = end - Duration::days(30);
        (DAY_SECONDS, DAILY_FORMAT)
    };

    Ok((start, end, bucket_seconds, format))
}

/// Every bucket label from start through end inclusive, aligned to UTC
/// bucket boundaries
fn bucket_labels(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bucket_seconds: i64,
    format: &str,
) -> Vec<String> {
    let first = start.timestamp().div_euclid(bucket_seconds);
    let last = end.timestamp().div_euclid(bucket_seconds);

    (first..=last)
        .filter_map(|index| DateTime::from_timestamp(index * bucket_seconds, 0))
        .map(|bucket| bucket.format(format).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_window_defaults_to_trailing_30_days() {
        let now = at(2024, 3, 31, 12, 0);
        let (start, end, bucket_seconds, format) = resolve_window(None, None, now).unwrap();

        assert_eq!(end, now);
        assert_eq!(start, now - Duration::days(30));
        assert_eq!(bucket_seconds, DAY_SECONDS);
        assert_eq!(format, DAILY_FORMAT);
    }

    #[test]
    fn test_window_one_day_or_less_is_hourly() {
        let (_, _, bucket_seconds, format) = resolve_window(
            Some(at(2024, 3, 1, 6, 0)),
            Some(at(2024, 3, 1, 18, 0)),
            at(2024, 3, 31, 0, 0),
        )
        .unwrap();

        assert_eq!(bucket_seconds, HOUR_SECONDS);
        assert_eq!(format, HOURLY_FORMAT);
    }

    #[test]
    fn test_window_up_to_seven_days_is_daily() {
        let (start, _, bucket_seconds, format) = resolve_window(
            Some(at(2024, 3, 1, 0, 0)),
            Some(at(2024, 3, 6, 0, 0)),
            at(2024, 3, 31, 0, 0),
        )
        .unwrap();

        assert_eq!(start, at(2024, 3, 1, 0, 0));
        assert_eq!(bucket_seconds, DAY_SECONDS);
        assert_eq!(format, DAILY_FORMAT);
    }

    #[test]
    fn test_window_longer_than_seven_days_clamps_to_30() {
        let end = at(2024, 6, 30, 0, 0);
        let (start, _, bucket_seconds, _) =
            resolve_window(Some(at(2024, 1, 1, 0, 0)), Some(end), end).unwrap();

        assert_eq!(start, end - Duration::days(30));
        assert_eq!(bucket_seconds, DAY_SECONDS);
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        let result = resolve_window(
            Some(at(2024, 3, 2, 0, 0)),
            Some(at(2024, 3, 1, 0, 0)),
            at(2024, 3, 31, 0, 0),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_hourly_labels_cover_partial_hours() {
        let labels = bucket_labels(
            at(2024, 3, 1, 8, 30),
            at(2024, 3, 1, 10, 10),
            HOUR_SECONDS,
            HOURLY_FORMAT,
        );

        assert_eq!(
            labels,
            vec![
                "2024-03-01 08:00".to_string(),
                "2024-03-01 09:00".to_string(),
                "2024-03-01 10:00".to_string(),
            ]
        );
    }

    #[test]
    fn test_daily_labels_inclusive_of_both_ends() {
        let labels = bucket_labels(
            at(2024, 2, 28, 12, 0),
            at(2024, 3, 2, 0, 0),
            DAY_SECONDS,
            DAILY_FORMAT,
        );

        assert_eq!(
            labels,
            vec![
                "2024-02-28".to_string(),
                "2024-02-29".to_string(),
                "2024-03-01".to_string(),
                "2024-03-02".to_string(),
            ]
        );
    }
}
