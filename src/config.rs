//! Run configuration: a JSON file merged over defaults, with environment
//! fallback for API credentials.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SiftError;
use crate::thresholds::DEFAULT_BATCH_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Openai,
    Anthropic,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_provider: Provider,
    pub model: String,
    /// Empty means "use the provider's environment variable".
    pub api_key: String,

    pub ollama_host: String,
    /// Requires explicit selection; there is no sensible default model.
    pub ollama_model: String,
    /// Local models can be slow; this bounds one oracle call.
    pub ollama_timeout_secs: u64,

    pub requests_per_minute: u32,
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_provider: Provider::Openai,
            model: "gpt-4o-mini".into(),
            api_key: String::new(),
            ollama_host: "http://localhost:11434".into(),
            ollama_model: String::new(),
            ollama_timeout_secs: 300,
            requests_per_minute: 60,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Load from `path`, filling any missing fields with defaults. A missing
    /// file is created with the defaults so users have something to edit.
    pub fn load(path: &Path) -> Result<Self, SiftError> {
        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let cfg: Config = serde_json::from_str(&raw)
                .map_err(|e| SiftError::Config(format!("{}: {e}", path.display())))?;
            Ok(cfg)
        } else {
            let cfg = Config::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SiftError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolve the API key: explicit config value first, then the
    /// provider's environment variable. Ollama needs none.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        let var = match self.api_provider {
            Provider::Openai => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Ollama => return None,
        };
        std::env::var(var).ok().filter(|k| !k.is_empty())
    }

    /// Check the configuration is usable before any oracle call is made,
    /// so misconfiguration fails fast with an actionable message.
    pub fn validate(&self) -> Result<(), SiftError> {
        if self.batch_size == 0 {
            return Err(SiftError::Config("batch_size must be at least 1".into()));
        }
        if self.requests_per_minute == 0 {
            return Err(SiftError::Config(
                "requests_per_minute must be at least 1".into(),
            ));
        }
        match self.api_provider {
            Provider::Ollama => {
                if self.ollama_model.is_empty() {
                    return Err(SiftError::Config(
                        "no Ollama model selected (set ollama_model)".into(),
                    ));
                }
            }
            Provider::Openai | Provider::Anthropic => {
                if self.model.is_empty() {
                    return Err(SiftError::Config("no model specified".into()));
                }
                if self.resolved_api_key().is_none() {
                    let var = match self.api_provider {
                        Provider::Anthropic => "ANTHROPIC_API_KEY",
                        _ => "OPENAI_API_KEY",
                    };
                    return Err(SiftError::Config(format!(
                        "no API key configured (set api_key or the {var} environment variable)"
                    )));
                }
            }
        }
        Ok(())
    }
}
