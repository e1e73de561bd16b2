// file: src/etl/scheduler.rs
// description: daily trigger driving the etl pipeline, no catchup
// reference: fixed time-of-day schedule with non-overlapping runs

use crate::error::{PipelineError, Result};
use crate::etl::pipeline::EtlPipeline;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tracing::{error, info};

/// First schedule occurrence strictly after `now` for the given UTC
/// hour:minute. An out-of-range time is a configuration error.
pub fn next_run_after(now: DateTime<Utc>, hour: u32, minute: u32) -> Result<DateTime<Utc>> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| {
            PipelineError::Config(format!(
                "invalid schedule time {:02}:{:02}",
                hour, minute
            ))
        })?
        .and_utc();

    Ok(if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    })
}

/// Fires the pipeline once per day at a fixed UTC time. Missed occurrences
/// are not backfilled; sleeping to the next occurrence simply skips them.
/// Overlap is impossible from this loop (runs are awaited), and the
/// pipeline's own run lock rejects concurrent triggers from elsewhere.
pub struct DailyScheduler {
    pipeline: Arc<EtlPipeline>,
    hour: u32,
    minute: u32,
}

impl DailyScheduler {
    pub fn new(pipeline: Arc<EtlPipeline>, hour: u32, minute: u32) -> Self {
        Self {
            pipeline,
            hour,
            minute,
        }
    }

    pub async fn run(&self) -> Result<()> {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.hour, self.minute)?;
            let wait = (next - now).to_std().unwrap_or_default();
            info!("Next ETL run scheduled for {} (in {:?})", next, wait);
            tokio::time::sleep(wait).await;

            match self.pipeline.run_once().await {
                Ok(report) if report.succeeded() => {
                    info!(
                        "Scheduled run {} succeeded, {} row(s) loaded",
                        report.run_id,
                        report.rows_loaded.unwrap_or(0)
                    );
                }
                Ok(report) => {
                    error!(
                        "Scheduled run {} failed: {}",
                        report.run_id,
                        report.error.as_deref().unwrap_or("unknown")
                    );
                }
                Err(e) => {
                    error!("Scheduled trigger rejected: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_next_run_later_same_day() {
        let now = Utc.with_ymd_and_hms(2025, 2, 11, 4, 30, 0).unwrap();
        let next = next_run_after(now, 6, 0).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 11, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 2, 11, 7, 0, 0).unwrap();
        let next = next_run_after(now, 6, 0).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 12, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_exact_schedule_time_rolls_forward() {
        // Firing exactly at the boundary schedules the next day, never a
        // duplicate run for the same occurrence.
        let now = Utc.with_ymd_and_hms(2025, 2, 11, 6, 0, 0).unwrap();
        let next = next_run_after(now, 6, 0).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 12, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_out_of_range_schedule_time_is_config_error() {
        let now = Utc.with_ymd_and_hms(2025, 2, 11, 6, 0, 0).unwrap();
        let err = next_run_after(now, 24, 0).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
