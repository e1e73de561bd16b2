// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document format error for {name}: {message}")]
    DocumentFormat { name: String, message: String },

    #[error("Translation unavailable: {0}")]
    TranslationUnavailable(String),

    #[error("Storage error in bucket {bucket}: {message}")]
    Storage { bucket: String, message: String },

    #[error("Staging timeout: {key} not observed in {bucket} after {waited_secs}s")]
    StagingTimeout {
        bucket: String,
        key: String,
        waited_secs: u64,
    },

    #[error("Load error for table {table}: {message}")]
    Load { table: String, message: String },

    #[error("Render error: {0}")]
    Render(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("File operation failed for {}: {source}", path.display())]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn storage(bucket: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            bucket: bucket.into(),
            message: message.into(),
        }
    }

    pub fn load(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn document_format(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DocumentFormat {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = PipelineError::storage("translate-source", "object not found: a.pdf");
        assert_eq!(
            err.to_string(),
            "Storage error in bucket translate-source: object not found: a.pdf"
        );
    }

    #[test]
    fn test_staging_timeout_display() {
        let err = PipelineError::StagingTimeout {
            bucket: "listings-transformed".to_string(),
            key: "response_data_11022025010203.csv".to_string(),
            waited_secs: 60,
        };
        assert!(err.to_string().contains("after 60s"));
    }
}
