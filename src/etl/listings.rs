// file: src/etl/listings.rs
// description: external real-estate search API client
// reference: HTTP GET with header-based auth and query parameters

use crate::config::ListingsConfig;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Source of one listings batch per pipeline run.
#[async_trait]
pub trait ListingsApi: Send + Sync {
    async fn search(&self) -> Result<Value>;
}

/// Client for a RapidAPI-style search endpoint: auth travels in a request
/// header, the location in a query parameter, the body is JSON.
pub struct HttpListingsClient {
    client: Client,
    endpoint: String,
    auth_header: String,
    api_key: String,
    location: String,
}

impl HttpListingsClient {
    pub fn new(config: &ListingsConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PipelineError::Config("listings.api_key is required for extraction".to_string())
        })?;

        Ok(Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            auth_header: config.auth_header.clone(),
            api_key,
            location: config.location.clone(),
        })
    }
}

#[async_trait]
impl ListingsApi for HttpListingsClient {
    async fn search(&self) -> Result<Value> {
        debug!("Fetching listings for {}", self.location);

        let response = self
            .client
            .get(&self.endpoint)
            .header(self.auth_header.as_str(), self.api_key.as_str())
            .query(&[("location", self.location.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let payload: Value = response.json().await?;
        Ok(payload)
    }
}
