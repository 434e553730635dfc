//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (default `~/.haul/config.json`) and environment.
//! Every section is optional; a missing file yields the built-in tables and defaults.

use crate::pipeline::load_search::SearchSettings;
use crate::taxonomy::Taxonomy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Keyword tables, expense categories and vehicle types.
    #[serde(default)]
    pub taxonomy: Taxonomy,

    /// Language model used by the availability pipeline.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Candidate selection for load searches.
    #[serde(default)]
    pub load_search: LoadSearchConfig,

    /// Router defaults.
    #[serde(default)]
    pub router: RouterConfig,
}

/// LLM settings. Disabled by default; keyword analysis is used instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Ollama base URL (default "http://127.0.0.1:11434"). Overridden by HAUL_LLM_BASE_URL env.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model name as listed by `ollama list` (e.g. "llama3.2:latest").
    #[serde(default = "default_llm_model")]
    pub model: String,
}

fn default_llm_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_llm_model() -> String {
    "llama3.2:latest".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSearchConfig {
    /// Chance (0.0..=1.0) that a load with no match points is still offered.
    #[serde(default = "default_discovery_probability")]
    pub discovery_probability: f64,

    /// Candidates kept before ranking.
    #[serde(default = "default_shortlist")]
    pub shortlist: usize,

    /// Loads shown in a reply.
    #[serde(default = "default_presented")]
    pub presented: usize,

    /// Fixed seed for discovery sampling and synthetic receipt ids. Unset means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_discovery_probability() -> f64 {
    0.3
}

fn default_shortlist() -> usize {
    5
}

fn default_presented() -> usize {
    3
}

impl Default for LoadSearchConfig {
    fn default() -> Self {
        Self {
            discovery_probability: default_discovery_probability(),
            shortlist: default_shortlist(),
            presented: default_presented(),
            seed: None,
        }
    }
}

impl LoadSearchConfig {
    pub fn settings(&self) -> SearchSettings {
        SearchSettings {
            discovery_probability: self.discovery_probability.clamp(0.0, 1.0),
            shortlist: self.shortlist,
            presented: self.presented,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterConfig {
    /// Driver id used when a caller supplies none (default "driver_123").
    #[serde(default = "default_driver_id")]
    pub default_driver_id: String,

    /// Reply sent when a message could not be processed.
    #[serde(default = "default_apology")]
    pub apology: String,
}

fn default_driver_id() -> String {
    "driver_123".to_string()
}

/// Reply text of error envelopes.
pub fn default_apology() -> String {
    "❌ Sorry, I encountered an error processing your message. Please try again or contact support."
        .to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_driver_id: default_driver_id(),
            apology: default_apology(),
        }
    }
}

/// Resolve the LLM base URL: env HAUL_LLM_BASE_URL overrides config.
pub fn resolve_llm_base_url(config: &Config) -> String {
    std::env::var("HAUL_LLM_BASE_URL")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .unwrap_or_else(|| config.llm.base_url.trim().to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("HAUL_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".haul").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, else the default path (or HAUL_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
