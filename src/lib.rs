// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns

pub mod config;
pub mod error;
pub mod etl;
pub mod storage;
pub mod translate;
pub mod utils;

pub use config::{Config, EtlConfig, ListingsConfig, RenderConfig, StorageConfig, TranslatorConfig};
pub use error::{PipelineError, Result};
pub use etl::{
    AvailabilityGate, CsvWarehouse, DailyScheduler, EtlPipeline, EtlRunReport, HttpListingsClient,
    ListingsApi, RetryPolicy, TaskOutcome, TaskRun, Warehouse,
};
pub use storage::{LocalBucketStore, MemoryStore, ObjectMeta, ObjectStore};
pub use translate::{
    CancelFlag, DocumentOutcome, GenerativeModelClient, PageLayout, PdfExtractor, PdfRenderer,
    ProcessReport, TranslateService, TranslationModel, Translator,
};
pub use utils::{PipelineStats, ProgressTracker, Validator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _config = Config::default_config();
        let _layout = PageLayout::default();
    }
}
