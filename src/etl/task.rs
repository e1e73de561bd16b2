// file: src/etl/task.rs
// description: task run records, typed payloads, and bounded retry execution
// reference: sequential task chain with per-task retry budget

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of one task node within a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(String),
    /// Not executed because an upstream task failed.
    Skipped,
}

/// One execution of a pipeline step, including its retry attempts.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub run_id: Uuid,
    pub task_id: String,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: TaskOutcome,
}

impl TaskRun {
    pub fn skipped(task_id: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            task_id: task_id.to_string(),
            attempts: 0,
            started_at: Utc::now(),
            finished_at: None,
            outcome: TaskOutcome::Skipped,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == TaskOutcome::Success
    }
}

/// Bounded retry budget applied uniformly to every task node.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

/// Typed handoff from the extract task.
#[derive(Debug, Clone)]
pub struct ExtractOutput {
    pub scratch_path: PathBuf,
    /// Key for the raw JSON artifact in the raw bucket.
    pub raw_key: String,
    /// Key of the derived flat file the gate waits for. A pure function of
    /// the run timestamp, so the gate polls for exactly what extract named.
    pub staged_key: String,
    pub batch_ts: String,
}

/// Typed handoff from the stage task.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub sha256: String,
}

/// Run `op` with the given retry budget, producing a [`TaskRun`] record
/// alongside the final result. Failure of attempt N sleeps `policy.delay`
/// and tries again until `max_retries` extra attempts are spent.
pub async fn run_with_retry<T, F, Fut>(
    task_id: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> (TaskRun, Result<T>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let mut attempts = 0;

    info!("Task {} starting (run {})", task_id, run_id);

    loop {
        attempts += 1;
        match op().await {
            Ok(value) => {
                let run = TaskRun {
                    run_id,
                    task_id: task_id.to_string(),
                    attempts,
                    started_at,
                    finished_at: Some(Utc::now()),
                    outcome: TaskOutcome::Success,
                };
                info!("Task {} succeeded after {} attempt(s)", task_id, attempts);
                return (run, Ok(value));
            }
            Err(e) if attempts <= policy.max_retries => {
                warn!(
                    "Task {} attempt {} failed ({}), retrying in {:?}",
                    task_id, attempts, e, policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                warn!(
                    "Task {} failed after {} attempt(s): {}",
                    task_id, attempts, e
                );
                let run = TaskRun {
                    run_id,
                    task_id: task_id.to_string(),
                    attempts,
                    started_at,
                    finished_at: Some(Utc::now()),
                    outcome: TaskOutcome::Failed(e.to_string()),
                };
                return (run, Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let (run, result) = run_with_retry("extract_listings", &policy, || async { Ok(7) }).await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(run.attempts, 1);
        assert!(run.succeeded());
        assert!(run.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_recovers_within_retry_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::ZERO);

        let (run, result) = run_with_retry("stage_to_raw", &policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(PipelineError::Validation("transient".to_string()))
                } else {
                    Ok("staged")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "staged");
        assert_eq!(run.attempts, 3);
        assert!(run.succeeded());
    }

    #[tokio::test]
    async fn test_fails_after_exhausting_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::ZERO);

        let (run, result) = run_with_retry("load_to_warehouse", &policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(PipelineError::Validation("permanent".to_string())) }
        })
        .await;

        assert!(result.is_err());
        // 1 initial attempt + 2 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(run.attempts, 3);
        assert_eq!(
            run.outcome,
            TaskOutcome::Failed("Validation error: permanent".to_string())
        );
    }

    #[test]
    fn test_skipped_run_record() {
        let run = TaskRun::skipped("await_transformed");
        assert_eq!(run.outcome, TaskOutcome::Skipped);
        assert_eq!(run.attempts, 0);
    }
}
