use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use super::EmbeddingClient;
use crate::error::EmbeddingError;

/// Embedding client for a local Ollama instance.
pub struct OllamaEmbeddings {
    pub model: String,
    /// For example: http://localhost:11434/api/embeddings
    pub api_url: String,
    pub client: Client,
}

impl OllamaEmbeddings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_url: "http://localhost:11434/api/embeddings".to_string(),
            client: Client::new(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn classify_send_error(&self, err: reqwest::Error) -> EmbeddingError {
        if err.is_timeout() {
            error!("timeout connecting to embedding service at {}", self.api_url);
            EmbeddingError::Timeout {
                url: self.api_url.clone(),
            }
        } else {
            error!(
                "failed to connect to embedding service at {}: {err}",
                self.api_url
            );
            EmbeddingError::Connection {
                url: self.api_url.clone(),
                detail: err.to_string(),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request_body = json!({
            "model": self.model,
            "prompt": text
        });

        let response = self
            .client
            .post(&self.api_url)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| self.classify_send_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("embedding service returned {status} for model '{}': {detail}", self.model);
            return Err(EmbeddingError::Remote {
                status: status.as_u16(),
                detail,
            });
        }

        let body: EmbeddingResponse =
            response.json().await.map_err(|err| EmbeddingError::Remote {
                status: status.as_u16(),
                detail: format!("invalid response body: {err}"),
            })?;

        debug!("embedded {} chars into {} dims", text.len(), body.embedding.len());
        Ok(body.embedding)
    }
}
