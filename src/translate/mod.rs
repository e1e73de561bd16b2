// file: src/translate/mod.rs
// description: document translation pipeline module exports
// reference: internal module structure

pub mod extractor;
pub mod renderer;
pub mod service;
pub mod translator;

pub use extractor::PdfExtractor;
pub use renderer::{PageLayout, PdfRenderer, wrap_text};
pub use service::{CancelFlag, DocumentOutcome, ProcessReport, TranslateService};
pub use translator::{GenerativeModelClient, TextChunk, TranslationModel, Translator, chunk_text};
