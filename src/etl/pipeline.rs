// file: src/etl/pipeline.rs
// description: four-node extract/stage/gate/load chain with typed handoffs
// reference: sequential daily workflow with bounded per-task retries

use crate::config::{EtlConfig, StorageConfig};
use crate::error::{PipelineError, Result};
use crate::etl::gate::AvailabilityGate;
use crate::etl::listings::ListingsApi;
use crate::etl::task::{
    ExtractOutput, RetryPolicy, StageOutput, TaskRun, run_with_retry,
};
use crate::etl::warehouse::Warehouse;
use crate::storage::ObjectStore;
use crate::utils::Validator;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub const TASK_EXTRACT: &str = "extract_listings";
pub const TASK_STAGE: &str = "stage_to_raw";
pub const TASK_GATE: &str = "await_transformed";
pub const TASK_LOAD: &str = "load_to_warehouse";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Result of one daily run: the per-task records plus the overall verdict.
/// A failed task leaves every downstream node recorded as skipped and the
/// warehouse untouched.
#[derive(Debug, Clone)]
pub struct EtlRunReport {
    pub run_id: Uuid,
    pub batch_ts: String,
    pub started_at: DateTime<Utc>,
    pub task_runs: Vec<TaskRun>,
    pub rows_loaded: Option<usize>,
    pub error: Option<String>,
}

impl EtlRunReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// The scheduled listings pipeline. All service handles are injected; the
/// run lock rejects overlapping triggers instead of queueing them.
pub struct EtlPipeline {
    store: Arc<dyn ObjectStore>,
    listings: Arc<dyn ListingsApi>,
    warehouse: Arc<dyn Warehouse>,
    scratch_dir: PathBuf,
    raw_bucket: String,
    transformed_bucket: String,
    table: String,
    gate: AvailabilityGate,
    retry: RetryPolicy,
    run_lock: Mutex<()>,
}

impl EtlPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        listings: Arc<dyn ListingsApi>,
        warehouse: Arc<dyn Warehouse>,
        storage: &StorageConfig,
        etl: &EtlConfig,
    ) -> Self {
        Self {
            store,
            listings,
            warehouse,
            scratch_dir: storage.scratch_dir.clone(),
            raw_bucket: storage.raw_bucket.clone(),
            transformed_bucket: storage.transformed_bucket.clone(),
            table: etl.table.clone(),
            gate: AvailabilityGate::new(
                Duration::from_secs(etl.poll_interval_secs),
                Duration::from_secs(etl.poll_timeout_secs),
            ),
            retry: RetryPolicy::new(etl.task_retries, Duration::from_secs(etl.retry_delay_secs)),
            run_lock: Mutex::new(()),
        }
    }

    /// Execute the chain once. An already-running pipeline rejects the
    /// trigger outright; a failed task halts the chain with downstream
    /// nodes marked skipped.
    pub async fn run_once(&self) -> Result<EtlRunReport> {
        let _guard = self.run_lock.try_lock().map_err(|_| {
            PipelineError::Validation("etl run already in progress".to_string())
        })?;

        let started_at = Utc::now();
        let batch_ts = started_at.format("%d%m%Y%H%M%S").to_string();
        let mut report = EtlRunReport {
            run_id: Uuid::new_v4(),
            batch_ts: batch_ts.clone(),
            started_at,
            task_runs: Vec::with_capacity(4),
            rows_loaded: None,
            error: None,
        };

        info!("ETL run {} starting, batch {}", report.run_id, batch_ts);

        let (run, extracted) =
            run_with_retry(TASK_EXTRACT, &self.retry, || self.extract(&batch_ts)).await;
        report.task_runs.push(run);
        let extracted = match extracted {
            Ok(output) => output,
            Err(e) => return Ok(self.halt(report, &[TASK_STAGE, TASK_GATE, TASK_LOAD], e)),
        };

        let (run, staged) =
            run_with_retry(TASK_STAGE, &self.retry, || self.stage(&extracted)).await;
        report.task_runs.push(run);
        let _staged: StageOutput = match staged {
            Ok(output) => output,
            Err(e) => return Ok(self.halt(report, &[TASK_GATE, TASK_LOAD], e)),
        };

        let (run, observed) = run_with_retry(TASK_GATE, &self.retry, || {
            self.gate
                .wait_for(self.store.as_ref(), &self.transformed_bucket, &extracted.staged_key)
        })
        .await;
        report.task_runs.push(run);
        if let Err(e) = observed {
            return Ok(self.halt(report, &[TASK_LOAD], e));
        }

        let (run, loaded) =
            run_with_retry(TASK_LOAD, &self.retry, || self.load(&extracted.staged_key)).await;
        report.task_runs.push(run);
        match loaded {
            Ok(rows) => {
                report.rows_loaded = Some(rows);
                info!(
                    "ETL run {} complete: {} row(s) loaded into {}",
                    report.run_id, rows, self.table
                );
            }
            Err(e) => return Ok(self.halt(report, &[], e)),
        }

        Ok(report)
    }

    fn halt(
        &self,
        mut report: EtlRunReport,
        skipped: &[&str],
        error: PipelineError,
    ) -> EtlRunReport {
        warn!("ETL run {} failed: {}", report.run_id, error);
        for task_id in skipped {
            report.task_runs.push(TaskRun::skipped(task_id));
        }
        report.error = Some(error.to_string());
        report
    }

    /// Extract: call the search API and park the raw JSON in scratch
    /// storage. Both artifact names derive from the batch timestamp alone.
    async fn extract(&self, batch_ts: &str) -> Result<ExtractOutput> {
        let payload = self.listings.search().await?;

        let raw_key = format!("response_data_{}.json", batch_ts);
        let staged_key = format!("response_data_{}.csv", batch_ts);
        Validator::validate_batch_key(&raw_key)?;
        Validator::validate_batch_key(&staged_key)?;

        fs::create_dir_all(&self.scratch_dir).await?;
        let scratch_path = self.scratch_dir.join(&raw_key);
        let pretty = serde_json::to_vec_pretty(&payload)?;
        fs::write(&scratch_path, &pretty)
            .await
            .map_err(|e| PipelineError::FileOperation {
                path: scratch_path.clone(),
                source: e,
            })?;

        info!("Extracted batch {} to {}", batch_ts, scratch_path.display());
        Ok(ExtractOutput {
            scratch_path,
            raw_key,
            staged_key,
            batch_ts: batch_ts.to_string(),
        })
    }

    /// Stage: move the scratch artifact into the raw bucket, recording a
    /// digest of what was shipped.
    async fn stage(&self, extracted: &ExtractOutput) -> Result<StageOutput> {
        let bytes = fs::read(&extracted.scratch_path).await.map_err(|e| {
            PipelineError::FileOperation {
                path: extracted.scratch_path.clone(),
                source: e,
            }
        })?;
        let size = bytes.len() as u64;
        let sha256 = format!("{:x}", Sha256::digest(&bytes));

        self.store
            .put(&self.raw_bucket, &extracted.raw_key, bytes, JSON_CONTENT_TYPE)
            .await?;

        fs::remove_file(&extracted.scratch_path).await.map_err(|e| {
            PipelineError::FileOperation {
                path: extracted.scratch_path.clone(),
                source: e,
            }
        })?;

        info!(
            "Staged {}/{} ({} bytes, sha256 {})",
            self.raw_bucket, extracted.raw_key, size, sha256
        );
        Ok(StageOutput {
            bucket: self.raw_bucket.clone(),
            key: extracted.raw_key.clone(),
            size,
            sha256,
        })
    }

    /// Load: full-replace copy of the transformed flat file into the
    /// target table, skipping its header row.
    async fn load(&self, staged_key: &str) -> Result<usize> {
        let bytes = self.store.get(&self.transformed_bucket, staged_key).await?;
        self.warehouse
            .load_replace(&self.table, &bytes, true)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::etl::task::TaskOutcome;
    use crate::etl::warehouse::CsvWarehouse;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    struct StaticListings;

    #[async_trait]
    impl ListingsApi for StaticListings {
        async fn search(&self) -> Result<serde_json::Value> {
            Ok(json!({"results": [{"price": 100}]}))
        }
    }

    struct OfflineListings;

    #[async_trait]
    impl ListingsApi for OfflineListings {
        async fn search(&self) -> Result<serde_json::Value> {
            Err(PipelineError::Validation("api unreachable".to_string()))
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        warehouse: Arc<CsvWarehouse>,
        pipeline: EtlPipeline,
        _scratch: TempDir,
    }

    fn fixture(listings: Arc<dyn ListingsApi>, poll_timeout_secs: u64) -> Fixture {
        let scratch = TempDir::new().unwrap();
        let mut config = Config::default_config();
        config.storage.scratch_dir = scratch.path().to_path_buf();
        config.etl.retry_delay_secs = 0;
        config.etl.poll_interval_secs = 1;
        config.etl.poll_timeout_secs = poll_timeout_secs;

        let store = Arc::new(MemoryStore::new());
        let warehouse = Arc::new(CsvWarehouse::new());
        let pipeline = EtlPipeline::new(
            store.clone(),
            listings,
            warehouse.clone(),
            &config.storage,
            &config.etl,
        );

        Fixture {
            store,
            warehouse,
            pipeline,
            _scratch: scratch,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_loads_transformed_batch() {
        let fx = fixture(Arc::new(StaticListings), 60);

        // An external transform watches the raw bucket and drops the
        // derived flat file into the transformed bucket.
        let store = fx.store.clone();
        tokio::spawn(async move {
            loop {
                let raw = store.list("listings-raw").await.unwrap();
                if let Some(object) = raw.first() {
                    let staged_key = object.key.replace(".json", ".csv");
                    store
                        .put(
                            "listings-transformed",
                            &staged_key,
                            b"price,beds\n100,2\n200,3\n".to_vec(),
                            "text/csv",
                        )
                        .await
                        .unwrap();
                    break;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });

        let report = fx.pipeline.run_once().await.unwrap();

        assert!(report.succeeded(), "run failed: {:?}", report.error);
        assert_eq!(report.rows_loaded, Some(2));
        assert_eq!(report.task_runs.len(), 4);
        assert!(report.task_runs.iter().all(TaskRun::succeeded));

        // Raw JSON was staged and removed from scratch.
        let raw_key = format!("response_data_{}.json", report.batch_ts);
        assert!(fx.store.exists("listings-raw", &raw_key).await.unwrap());
        assert_eq!(
            fx.warehouse.rows("listings"),
            vec![vec!["100", "2"], vec!["200", "3"]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_timeout_leaves_warehouse_untouched() {
        let fx = fixture(Arc::new(StaticListings), 5);

        let report = fx.pipeline.run_once().await.unwrap();

        assert!(!report.succeeded());
        assert!(report.error.as_deref().unwrap().contains("Staging timeout"));
        assert_eq!(report.rows_loaded, None);
        assert_eq!(fx.warehouse.row_count("listings").await.unwrap(), 0);

        // Extract and stage ran; gate failed; load never executed.
        assert_eq!(report.task_runs.len(), 4);
        assert_eq!(report.task_runs[0].outcome, TaskOutcome::Success);
        assert_eq!(report.task_runs[1].outcome, TaskOutcome::Success);
        assert!(matches!(report.task_runs[2].outcome, TaskOutcome::Failed(_)));
        assert_eq!(report.task_runs[3].outcome, TaskOutcome::Skipped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_failure_skips_all_downstream_tasks() {
        let fx = fixture(Arc::new(OfflineListings), 60);

        let report = fx.pipeline.run_once().await.unwrap();

        assert!(!report.succeeded());
        assert_eq!(report.task_runs.len(), 4);
        assert!(matches!(report.task_runs[0].outcome, TaskOutcome::Failed(_)));
        // Extract was retried: 1 attempt + 2 retries.
        assert_eq!(report.task_runs[0].attempts, 3);
        for run in &report.task_runs[1..] {
            assert_eq!(run.outcome, TaskOutcome::Skipped);
        }
        assert!(fx.store.list("listings-raw").await.unwrap().is_empty());
    }
}
