// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{PipelineError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub translator: TranslatorConfig,
    pub render: RenderConfig,
    pub listings: ListingsConfig,
    pub etl: EtlConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub scratch_dir: PathBuf,
    pub source_bucket: String,
    pub destination_bucket: String,
    pub raw_bucket: String,
    pub transformed_bucket: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslatorConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub target_language: String,
    pub candidate_count: u32,
    pub max_output_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub safety_threshold: String,
    pub max_chunk_chars: usize,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    pub page_width: i64,
    pub page_height: i64,
    pub margin_x: i64,
    pub margin_top: i64,
    pub margin_bottom: i64,
    pub font_size: i64,
    pub line_height: i64,
    pub wrap_width: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingsConfig {
    pub endpoint: String,
    pub auth_header: String,
    pub api_key: Option<String>,
    pub location: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EtlConfig {
    pub table: String,
    pub schedule_hour: u32,
    pub schedule_minute: u32,
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
    pub task_retries: u32,
    pub retry_delay_secs: u64,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CLOUDGLUE")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            storage: StorageConfig {
                root: PathBuf::from("./data/buckets"),
                scratch_dir: PathBuf::from("./data/scratch"),
                source_bucket: "translate-source".to_string(),
                destination_bucket: "translate-destination".to_string(),
                raw_bucket: "listings-raw".to_string(),
                transformed_bucket: "listings-transformed".to_string(),
            },
            translator: TranslatorConfig {
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                model: "gemini-1.5-flash-001".to_string(),
                api_key: None,
                target_language: "French".to_string(),
                candidate_count: 1,
                max_output_tokens: 8192,
                temperature: 0.0,
                top_p: 1.0,
                top_k: 1,
                safety_threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
                max_chunk_chars: 12_000,
                retry_attempts: 3,
                retry_base_delay_ms: 500,
            },
            render: RenderConfig {
                page_width: 612,
                page_height: 792,
                margin_x: 40,
                margin_top: 750,
                margin_bottom: 40,
                font_size: 12,
                line_height: 14,
                wrap_width: 80,
            },
            listings: ListingsConfig {
                endpoint: "https://zillow56.p.rapidapi.com/search".to_string(),
                auth_header: "X-RapidAPI-Key".to_string(),
                api_key: None,
                location: "houston, tx".to_string(),
            },
            etl: EtlConfig {
                table: "listings".to_string(),
                schedule_hour: 6,
                schedule_minute: 0,
                poll_interval_secs: 5,
                poll_timeout_secs: 60,
                task_retries: 2,
                retry_delay_secs: 15,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.render.wrap_width == 0 {
            return Err(PipelineError::Config(
                "wrap_width must be greater than 0".to_string(),
            ));
        }

        if self.render.line_height <= 0 {
            return Err(PipelineError::Config(
                "line_height must be greater than 0".to_string(),
            ));
        }

        if self.render.margin_top <= self.render.margin_bottom {
            return Err(PipelineError::Config(
                "margin_top must be greater than margin_bottom".to_string(),
            ));
        }

        if self.translator.max_chunk_chars == 0 {
            return Err(PipelineError::Config(
                "max_chunk_chars must be greater than 0".to_string(),
            ));
        }

        if self.etl.poll_interval_secs == 0 {
            return Err(PipelineError::Config(
                "poll_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.etl.poll_timeout_secs < self.etl.poll_interval_secs {
            return Err(PipelineError::Config(
                "poll_timeout_secs must be at least poll_interval_secs".to_string(),
            ));
        }

        if self.etl.schedule_hour > 23 || self.etl.schedule_minute > 59 {
            return Err(PipelineError::Config(
                "schedule_hour/schedule_minute out of range".to_string(),
            ));
        }

        Ok(())
    }
}
