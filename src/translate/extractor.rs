// file: src/translate/extractor.rs
// description: plain-text extraction from PDF bytes
// reference: https://docs.rs/pdf-extract

use crate::error::{PipelineError, Result};
use tracing::debug;

/// Extracts plain text from PDF documents, pages concatenated in order.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract all text from `bytes`. Invalid or non-PDF input yields a
    /// `PipelineError::DocumentFormat` carrying `name` so callers can
    /// report per-file failures and continue.
    pub fn extract(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| PipelineError::document_format(name, e.to_string()))?;

        debug!("Extracted {} chars from {}", text.len(), name);
        Ok(text)
    }
}
