// file: src/etl/mod.rs
// description: scheduled listings ETL module exports
// reference: internal module structure

pub mod gate;
pub mod listings;
pub mod pipeline;
pub mod scheduler;
pub mod task;
pub mod warehouse;

pub use gate::AvailabilityGate;
pub use listings::{HttpListingsClient, ListingsApi};
pub use pipeline::{EtlPipeline, EtlRunReport};
pub use scheduler::{DailyScheduler, next_run_after};
pub use task::{ExtractOutput, RetryPolicy, StageOutput, TaskOutcome, TaskRun, run_with_retry};
pub use warehouse::{CsvWarehouse, Warehouse};
