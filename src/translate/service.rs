// file: src/translate/service.rs
// description: clear/upload/process controller over the staging buckets
// reference: orchestrates extract, translate, render, publish per document

use crate::error::{PipelineError, Result};
use crate::storage::ObjectStore;
use crate::translate::extractor::PdfExtractor;
use crate::translate::renderer::PdfRenderer;
use crate::translate::translator::Translator;
use crate::utils::{ProgressTracker, Validator};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

const PDF_CONTENT_TYPE: &str = "application/pdf";
const TRANSLATED_PREFIX: &str = "translated_";

/// Cooperative cancellation flag checked between documents, never inside
/// one. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one source document during `process`.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub source_key: String,
    pub published_key: Option<String>,
    pub published_bytes: u64,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl DocumentOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of one `process` action.
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    pub outcomes: Vec<DocumentOutcome>,
    pub skipped_non_pdf: usize,
    pub cancelled: bool,
}

impl ProcessReport {
    pub fn processed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }
}

/// Drives the translation pipeline over a source and a destination staging
/// bucket. All service handles are injected; nothing global.
pub struct TranslateService {
    store: Arc<dyn ObjectStore>,
    source_bucket: String,
    destination_bucket: String,
    extractor: PdfExtractor,
    translator: Translator,
    renderer: PdfRenderer,
}

impl TranslateService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        source_bucket: impl Into<String>,
        destination_bucket: impl Into<String>,
        translator: Translator,
        renderer: PdfRenderer,
    ) -> Self {
        Self {
            store,
            source_bucket: source_bucket.into(),
            destination_bucket: destination_bucket.into(),
            extractor: PdfExtractor::new(),
            translator,
            renderer,
        }
    }

    /// Delete every object in both staging areas. Irreversible and
    /// unconditional. Returns (source deleted, destination deleted).
    pub async fn clear(&self) -> Result<(usize, usize)> {
        let source = self.clear_bucket(&self.source_bucket).await?;
        let destination = self.clear_bucket(&self.destination_bucket).await?;
        info!(
            "Cleared staging areas: {} source, {} destination object(s)",
            source, destination
        );
        Ok((source, destination))
    }

    async fn clear_bucket(&self, bucket: &str) -> Result<usize> {
        let objects = self.store.list(bucket).await?;
        let count = objects.len();
        for object in objects {
            self.store.delete(bucket, &object.key).await?;
        }
        Ok(count)
    }

    /// Copy each local file into the source staging area, preserving its
    /// file name.
    pub async fn upload(&self, files: &[impl AsRef<Path>]) -> Result<usize> {
        let mut uploaded = 0;

        for file in files {
            let path = file.as_ref();
            Validator::validate_file_path(path)?;
            Validator::validate_pdf_extension(path)?;

            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    PipelineError::Validation(format!("unusable file name: {}", path.display()))
                })?
                .to_string();

            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| PipelineError::FileOperation {
                    path: path.to_path_buf(),
                    source: e,
                })?;

            self.store
                .put(&self.source_bucket, &name, bytes, PDF_CONTENT_TYPE)
                .await?;
            info!("Uploaded {} to {}", name, self.source_bucket);
            uploaded += 1;
        }

        Ok(uploaded)
    }

    /// Run extract -> translate -> render -> publish for every PDF in the
    /// source staging area. Documents are independent: a failure is
    /// recorded in the report and the loop moves on. `cancel` is honored
    /// between documents.
    pub async fn process(&self, cancel: &CancelFlag) -> Result<ProcessReport> {
        let objects = self.store.list(&self.source_bucket).await?;
        let progress = ProgressTracker::new(objects.len());
        let mut report = ProcessReport::default();

        for object in objects {
            if cancel.is_cancelled() {
                warn!("Processing cancelled before {}", object.key);
                report.cancelled = true;
                break;
            }

            if !has_pdf_extension(&object.key) {
                report.skipped_non_pdf += 1;
                progress.inc_skipped();
                continue;
            }

            info!("Processing: {}", object.key);
            progress.set_message(object.key.clone());
            let started = Instant::now();
            let outcome = match self.process_document(&object.key).await {
                Ok((published_key, published_bytes)) => {
                    progress.inc_processed();
                    progress.add_bytes_published(published_bytes);
                    DocumentOutcome {
                        source_key: object.key,
                        published_key: Some(published_key),
                        published_bytes,
                        error: None,
                        duration_ms: started.elapsed().as_millis() as u64,
                    }
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", object.key, e);
                    progress.inc_failed();
                    DocumentOutcome {
                        source_key: object.key,
                        published_key: None,
                        published_bytes: 0,
                        error: Some(e.to_string()),
                        duration_ms: started.elapsed().as_millis() as u64,
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        progress.finish();
        let stats = progress.get_stats();
        info!(
            "Process complete: {} translated, {} failed, {} skipped, {} bytes published ({:.0}% success)",
            stats.documents_processed,
            stats.documents_failed,
            stats.documents_skipped,
            stats.total_bytes_published,
            stats.success_rate()
        );
        Ok(report)
    }

    async fn process_document(&self, key: &str) -> Result<(String, u64)> {
        let bytes = self.store.get(&self.source_bucket, key).await?;

        let text = self.extractor.extract(key, &bytes)?;
        Validator::validate_content_not_empty(&text)?;
        let translated = self.translator.translate(&text).await?;
        let rendered = self.renderer.render(&translated)?;
        let published_bytes = rendered.len() as u64;

        let digest = Sha256::digest(&rendered);
        let published_key = format!("{}{}", TRANSLATED_PREFIX, key);

        self.store
            .put(
                &self.destination_bucket,
                &published_key,
                rendered,
                PDF_CONTENT_TYPE,
            )
            .await?;

        info!(
            "Published {}/{} (sha256 {:x})",
            self.destination_bucket, published_key, digest
        );
        Ok((published_key, published_bytes))
    }
}

fn has_pdf_extension(key: &str) -> bool {
    key.to_ascii_lowercase().ends_with(".pdf")
}
