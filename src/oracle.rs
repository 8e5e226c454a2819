//! Talks to the semantic-grouping oracle over HTTP.
//!
//! The engine only sees the [`Oracle`] trait; this module provides the
//! production implementation routing to OpenAI-compatible, Anthropic, or
//! Ollama endpoints. The oracle owns model selection, auth, and timeouts;
//! the engine just hands it a rendered prompt and gets raw text back.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, Provider};
use crate::error::SiftError;
use crate::prompts;
use crate::thresholds::ORACLE_MAX_TOKENS;
use crate::types::ItemType;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Cloud providers answer well within this; Ollama gets its own budget.
const CLOUD_TIMEOUT: Duration = Duration::from_secs(120);

/// Capability seam for the semantic-grouping service. Anything that can turn
/// a prompt into reply text can stand in: the HTTP client here, or a
/// scripted double in tests.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// One grouping call. Returns the raw reply text; the caller parses it.
    ///
    /// A timeout maps to [`SiftError::OracleTimeout`] (recoverable); every
    /// other failure is [`SiftError::OracleBackend`] and aborts the run.
    async fn call(&self, prompt: &str, item_type: ItemType) -> Result<String, SiftError>;
}

pub struct HttpOracle {
    cfg: Config,
    client: reqwest::Client,
}

impl HttpOracle {
    pub fn new(cfg: &Config) -> Result<Self, SiftError> {
        let timeout = match cfg.api_provider {
            Provider::Ollama => Duration::from_secs(cfg.ollama_timeout_secs),
            _ => CLOUD_TIMEOUT,
        };
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SiftError::OracleBackend(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            cfg: cfg.clone(),
            client,
        })
    }

    async fn call_openai(&self, prompt: &str) -> Result<String, SiftError> {
        let req = ChatRequest {
            model: self.cfg.model.clone(),
            max_tokens: ORACLE_MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompts::SYSTEM.into(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.into(),
                },
            ],
        };

        let key = self.cfg.resolved_api_key().unwrap_or_default();
        let resp = self
            .client
            .post(OPENAI_URL)
            .header("Authorization", format!("Bearer {key}"))
            .json(&req)
            .send()
            .await
            .map_err(send_err)?;
        let resp = check_status(resp).await?;

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| SiftError::OracleBackend(format!("reply decode failed: {e}")))?;
        Ok(chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn call_anthropic(&self, prompt: &str) -> Result<String, SiftError> {
        let req = ChatRequest {
            model: self.cfg.model.clone(),
            max_tokens: ORACLE_MAX_TOKENS,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.into(),
            }],
        };

        let key = self.cfg.resolved_api_key().unwrap_or_default();
        let resp = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .map_err(send_err)?;
        let resp = check_status(resp).await?;

        let reply: AnthropicResponse = resp
            .json()
            .await
            .map_err(|e| SiftError::OracleBackend(format!("reply decode failed: {e}")))?;
        let text = reply
            .content
            .into_iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }

    async fn call_ollama(&self, prompt: &str, item_type: ItemType) -> Result<String, SiftError> {
        // Ollama has no system role worth relying on across models; the
        // system text is folded into the user message. The `format` schema
        // constrains output shape server-side.
        let req = OllamaRequest {
            model: self.cfg.ollama_model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: format!("{}\n\n{prompt}", prompts::SYSTEM),
            }],
            stream: false,
            format: Some(prompts::cluster_array_schema(item_type)),
            options: OllamaOptions {
                temperature: 0.0,
                num_predict: ORACLE_MAX_TOKENS,
            },
        };

        let url = format!("{}/api/chat", self.cfg.ollama_host.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(send_err)?;
        let resp = check_status(resp).await?;

        let reply: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| SiftError::OracleBackend(format!("reply decode failed: {e}")))?;
        Ok(reply.message.content)
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn call(&self, prompt: &str, item_type: ItemType) -> Result<String, SiftError> {
        debug!(provider = ?self.cfg.api_provider, %item_type, "oracle call");
        match self.cfg.api_provider {
            Provider::Openai => self.call_openai(prompt).await,
            Provider::Anthropic => self.call_anthropic(prompt).await,
            Provider::Ollama => self.call_ollama(prompt, item_type).await,
        }
    }
}

fn send_err(e: reqwest::Error) -> SiftError {
    if e.is_timeout() {
        SiftError::OracleTimeout
    } else {
        SiftError::OracleBackend(format!("request failed: {e}"))
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SiftError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(SiftError::OracleBackend(format!(
        "oracle returned {status}: {body}"
    )))
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    message: OllamaMessage,
}

#[derive(Deserialize, Default)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}
