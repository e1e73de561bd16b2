// file: src/utils/validation.rs
// description: data validation utilities and helpers
// reference: input validation patterns

use crate::error::{PipelineError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;

lazy_static! {
    // response_data_<ddmmYYYYHHMMSS>.<json|csv>
    static ref BATCH_KEY: Regex =
        Regex::new(r"^response_data_\d{14}\.(json|csv)$").expect("invalid batch key pattern");
}

pub struct Validator;

impl Validator {
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            PipelineError::Validation(format!(
                "Cannot canonicalize path {}: {}",
                path.display(),
                e
            ))
        })?;

        if !canonical.is_file() {
            return Err(PipelineError::Validation(format!(
                "Path is not a file: {}",
                canonical.display()
            )));
        }

        Ok(())
    }

    pub fn validate_pdf_extension(path: &Path) -> Result<()> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
        {
            Some(ext) if ext == "pdf" => Ok(()),
            _ => Err(PipelineError::Validation(format!(
                "File is not a PDF: {}",
                path.display()
            ))),
        }
    }

    pub fn validate_content_not_empty(content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(PipelineError::Validation("Content is empty".to_string()));
        }
        Ok(())
    }

    /// Staged batch artifacts must follow the timestamp-derived naming
    /// scheme; the gate polls for exactly this shape.
    pub fn validate_batch_key(key: &str) -> Result<()> {
        if BATCH_KEY.is_match(key) {
            return Ok(());
        }
        Err(PipelineError::Validation(format!(
            "Batch key does not match response_data_<ts> pattern: {}",
            key
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extension_accepts_uppercase() {
        assert!(Validator::validate_pdf_extension(Path::new("A.PDF")).is_ok());
        assert!(Validator::validate_pdf_extension(Path::new("a.pdf")).is_ok());
        assert!(Validator::validate_pdf_extension(Path::new("a.txt")).is_err());
        assert!(Validator::validate_pdf_extension(Path::new("noext")).is_err());
    }

    #[test]
    fn test_batch_key_pattern() {
        assert!(Validator::validate_batch_key("response_data_11022025010203.json").is_ok());
        assert!(Validator::validate_batch_key("response_data_11022025010203.csv").is_ok());
        assert!(Validator::validate_batch_key("response_data_abc.csv").is_err());
        assert!(Validator::validate_batch_key("other_11022025010203.csv").is_err());
    }

    #[test]
    fn test_content_not_empty() {
        assert!(Validator::validate_content_not_empty("text").is_ok());
        assert!(Validator::validate_content_not_empty("  \n ").is_err());
    }

    #[test]
    fn test_validate_file_path_rejects_missing() {
        assert!(Validator::validate_file_path(Path::new("/does/not/exist.pdf")).is_err());
    }
}
