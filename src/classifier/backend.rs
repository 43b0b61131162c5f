//! Classification backend transport.
//!
//! The engine only needs "send prompt, get text back"; everything else
//! (cooldown, prompt shape, verdict parsing) lives in the classifier
//! proper. The HTTP implementation speaks the Ollama generate API, which
//! is what the desktop shell runs locally.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a classification backend call.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Could not reach the backend at all.
    #[error("connection error: {0}")]
    Connection(String),
    /// Backend answered with a non-success status.
    #[error("backend error: {0}")]
    Backend(String),
    /// Response body did not parse.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A text-completion capability the classifier can call.
#[async_trait]
pub trait ClassifyBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError>;
}

/// Generate-API request format.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

/// Generate-API response format.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP backend against an Ollama-compatible generate endpoint.
pub struct HttpBackend {
    endpoint: String,
    model: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(endpoint: String, model: String, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint,
            model,
            client,
        }
    }
}

#[async_trait]
impl ClassifyBackend for HttpBackend {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                // Near-deterministic output keeps the JSON contract stable.
                temperature: 0.1,
                num_predict: 800,
            },
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::Backend(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        Ok(parsed.response)
    }
}
