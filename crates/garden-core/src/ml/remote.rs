//! Client for a model-serving endpoint that hosts the allocation and text
//! models.
//!
//! - `POST {base}/allocate` with `{"features": [[f64; 8], ...]}` returns
//!   `{"fractions": [f64, ...]}`
//! - `POST {base}/generate` with `{"prompt": "...", "max_length": n}`
//!   returns `{"text": "..."}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ModelError;
use crate::combined::{AllocationEstimator, FEATURE_COUNT, InstructionWriter};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct HttpModelClient {
    base_url: String,
    http: Client,
}

#[derive(Serialize)]
struct AllocateRequest<'a> {
    features: &'a [[f64; FEATURE_COUNT]],
}

#[derive(Deserialize)]
struct AllocateResponse {
    fractions: Vec<f64>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    max_length: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

impl HttpModelClient {
    /// Client for the model server at `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ModelError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Client with an explicit per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ModelError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Server URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ModelError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "calling model server");
        let response = self.http.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl AllocationEstimator for HttpModelClient {
    async fn estimate(&self, rows: &[[f64; FEATURE_COUNT]]) -> Result<Vec<f64>, ModelError> {
        let response: AllocateResponse = self
            .post("/allocate", &AllocateRequest { features: rows })
            .await?;
        Ok(response.fractions)
    }
}

#[async_trait]
impl InstructionWriter for HttpModelClient {
    async fn write(&self, prompt: &str, max_length: usize) -> Result<String, ModelError> {
        let response: GenerateResponse = self
            .post("/generate", &GenerateRequest { prompt, max_length })
            .await?;
        Ok(response.text)
    }
}
