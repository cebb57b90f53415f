use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::CompletionClient;

/// Completion client for the Gemini `generateContent` API.
pub struct GeminiClient {
    pub api_key: String,
    pub model: String,
    /// For example: https://generativelanguage.googleapis.com/v1beta/models
    pub api_url: String,
    pub client: Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            client: Client::new(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request_body = json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }]
        });

        debug!("request: {}", request_body);

        let url = format!("{}/{}:generateContent", self.api_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let code = response.status();
        let response_text = response.text().await?;
        debug!("response: {code:?} {response_text}");

        if !code.is_success() {
            return Err(anyhow!(
                "completion provider returned {code}: {response_text}"
            ));
        }

        let response_json: serde_json::Value =
            serde_json::from_str(&response_text).context("invalid completion response body")?;

        let parts = response_json
            .pointer("/candidates/0/content/parts")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("completion response has no candidates"))?;

        let text = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
            .collect::<Vec<_>>()
            .join("");

        Ok(text)
    }
}
