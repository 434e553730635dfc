//! LLM adapter contract and implementations.
//!
//! Pipelines only see [`LlmAdapter`]. Every call may fail; callers fall back to local heuristics.

mod ollama;

pub use ollama::{OllamaAdapter, OllamaClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm adapter disabled")]
    Disabled,
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm api error: {0}")]
    Api(String),
    #[error("llm returned malformed output: {0}")]
    Malformed(String),
}

/// Structured reading of an availability message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityAnalysis {
    pub status: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

fn default_confidence() -> f64 {
    0.8
}

/// Narrow request/response contract with a language model.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Ask for a JSON analysis of a prompt.
    async fn analyze(&self, prompt: &str) -> Result<AvailabilityAnalysis, LlmError>;

    /// Ask for free text.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Adapter used when no model is configured: every call fails with [`LlmError::Disabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLlm;

#[async_trait]
impl LlmAdapter for DisabledLlm {
    async fn analyze(&self, _prompt: &str) -> Result<AvailabilityAnalysis, LlmError> {
        Err(LlmError::Disabled)
    }

    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Disabled)
    }
}

/// Parse model output as an analysis, tolerating a fenced code block or prose around the JSON object.
pub fn parse_analysis(text: &str) -> Result<AvailabilityAnalysis, LlmError> {
    let trimmed = text.trim();
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    let body = match (start, end) {
        (Some(s), Some(e)) if s < e => &trimmed[s..=e],
        _ => return Err(LlmError::Malformed("no JSON object in response".to_string())),
    };
    serde_json::from_str(body).map_err(|e| LlmError::Malformed(e.to_string()))
}
