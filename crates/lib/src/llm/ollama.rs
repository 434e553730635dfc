//! Ollama API client (http://127.0.0.1:11434 by default) and the adapter built on it.
//! Uses non-streaming `/api/generate`; JSON mode for analyses.

use super::{parse_analysis, AvailabilityAnalysis, LlmAdapter, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Client for the Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /api/generate: single completion. `json` asks the model for a JSON object.
    pub async fn generate(&self, model: &str, prompt: &str, json: bool) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            format: json.then_some("json"),
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{} {}", status, body)));
        }
        let data: GenerateResponse = res.json().await?;
        Ok(data.response)
    }
}

/// [`LlmAdapter`] backed by a local Ollama model.
#[derive(Clone)]
pub struct OllamaAdapter {
    client: OllamaClient,
    model: String,
}

impl OllamaAdapter {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmAdapter for OllamaAdapter {
    async fn analyze(&self, prompt: &str) -> Result<AvailabilityAnalysis, LlmError> {
        let text = self.client.generate(&self.model, prompt, true).await?;
        parse_analysis(&text)
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let text = self.client.generate(&self.model, prompt, false).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::Malformed("empty completion".to_string()));
        }
        Ok(text.to_string())
    }
}
