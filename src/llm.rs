//! LLM backends answering oracle prompts
//!
//! The search itself is synchronous; `AnthropicClient` issues its async
//! HTTP call on a tokio runtime handle and blocks the calling worker thread
//! until the answer arrives.

use crate::config::OracleConfig;
use anyhow::{anyhow, Result};
use tokio::runtime::Handle;

/// Text and token usage of one completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completed {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A text-generation backend
pub trait Completion: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<Completed>;

    /// Dollar cost of a completion on this backend
    fn price(&self, _completed: &Completed) -> f64 {
        0.0
    }
}

/// Anthropic Messages API backend
pub struct AnthropicClient {
    config: OracleConfig,
    client: reqwest::Client,
    runtime: Handle,
}

impl AnthropicClient {
    /// `runtime` must outlive the client; `complete` must be called from a
    /// thread outside that runtime's async context (e.g. `spawn_blocking`).
    pub fn new(config: OracleConfig, runtime: Handle) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            runtime,
        }
    }

    pub async fn complete_async(&self, prompt: &str) -> Result<Completed> {
        if self.config.api_key.is_empty() {
            return Err(anyhow!(
                "ANTHROPIC_API_KEY not set. Oracle requires API access."
            ));
        }

        let request_body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let api_response = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !api_response.status().is_success() {
            let error_text = api_response.text().await?;
            return Err(anyhow!("API error: {}", error_text));
        }

        let response_json: serde_json::Value = api_response.json().await?;
        parse_completion(&response_json)
    }
}

impl Completion for AnthropicClient {
    fn complete(&self, prompt: &str) -> Result<Completed> {
        self.runtime.block_on(self.complete_async(prompt))
    }

    fn price(&self, completed: &Completed) -> f64 {
        self.config
            .price(completed.input_tokens, completed.output_tokens)
    }
}

/// Extract text and usage from a Messages API response
fn parse_completion(json: &serde_json::Value) -> Result<Completed> {
    let text = json["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .ok_or_else(|| anyhow!("Response has no content: {}", json))?;

    Ok(Completed {
        text,
        input_tokens: json["usage"]["input_tokens"].as_u64().unwrap_or(0),
        output_tokens: json["usage"]["output_tokens"].as_u64().unwrap_or(0),
    })
}
