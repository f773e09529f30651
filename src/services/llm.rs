//! LLM oracle for supervisor tool-calling
//!
//! The oracle is a narrow interface: given a system description, the
//! accumulated transcript, and a tool catalog, it returns either a final
//! textual answer or exactly one tool invocation from the catalog.

use crate::agents::{Delegation, ToolSpec};
use crate::error::{ClickshopError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One exchange in the supervisor's working transcript
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// One oracle step: a final answer or one tool invocation
#[derive(Debug, Clone)]
pub enum LlmTurn {
    Reply(String),
    Invoke(Delegation),
}

/// LLM oracle trait
#[async_trait]
pub trait LlmOracle: Send + Sync {
    async fn next_turn(
        &self,
        system: &str,
        transcript: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<LlmTurn>;
}

/// Configuration for the Anthropic oracle
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Anthropic API key
    pub api_key: String,

    /// Model to use
    pub model: String,

    /// Max tokens for responses
    pub max_tokens: usize,

    /// Temperature for sampling
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

/// LLM oracle over the Anthropic messages API
pub struct AnthropicOracle {
    config: LlmConfig,
    client: Client,
}

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    system: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a serde_json::Value,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
}

impl AnthropicOracle {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn with_default() -> Result<Self> {
        Self::new(LlmConfig::default())
    }
}

#[async_trait]
impl LlmOracle for AnthropicOracle {
    async fn next_turn(
        &self,
        system: &str,
        transcript: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<LlmTurn> {
        if self.config.api_key.is_empty() {
            return Err(ClickshopError::LlmFailure(
                "ANTHROPIC_API_KEY not set".to_string(),
            ));
        }

        debug!("Calling Anthropic API ({} messages)", transcript.len());

        let request = AnthropicRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages: transcript,
            tools: tools
                .iter()
                .map(|t| AnthropicTool {
                    name: &t.name,
                    description: &t.description,
                    input_schema: &t.input_schema,
                })
                .collect(),
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ClickshopError::LlmFailure(format!("network failure: {}", e))
                } else {
                    ClickshopError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => ClickshopError::LlmFailure(format!(
                    "invalid or missing API key (status {}): {}",
                    status, error_text
                )),
                429 => {
                    ClickshopError::LlmFailure(format!("rate limit exceeded: {}", error_text))
                }
                500..=599 => ClickshopError::LlmFailure(format!(
                    "service unavailable (status {}): {}",
                    status, error_text
                )),
                _ => ClickshopError::LlmFailure(format!(
                    "request failed with status {}: {}",
                    status, error_text
                )),
            });
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ClickshopError::LlmFailure(format!("failed to parse response: {}", e)))?;

        // A tool_use block wins over any accompanying text
        let mut reply_text = None;
        for block in api_response.content {
            match block {
                ContentBlock::ToolUse { name, input } => {
                    let delegation = Delegation::from_tool_call(&name, input)?;
                    return Ok(LlmTurn::Invoke(delegation));
                }
                ContentBlock::Text { text } => {
                    reply_text.get_or_insert(text);
                }
            }
        }

        reply_text
            .map(LlmTurn::Reply)
            .ok_or_else(|| ClickshopError::LlmFailure("empty response from API".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_block_parsing() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "Let me search for that."},
                {"type": "tool_use", "id": "tu_1", "name": "delegate_search",
                 "input": {"query": "running shoes"}}
            ]
        }"#;

        let response: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.content.len(), 2);
        assert!(matches!(
            response.content[1],
            ContentBlock::ToolUse { .. }
        ));
    }

    #[test]
    fn test_request_serializes_tools() {
        let tools = Delegation::tool_specs();
        let messages = vec![ChatMessage::user("find me shoes")];
        let request = AnthropicRequest {
            model: "claude-haiku-4-5-20251001",
            max_tokens: 512,
            temperature: 0.2,
            system: "You are a supervisor.",
            messages: &messages,
            tools: tools
                .iter()
                .map(|t| AnthropicTool {
                    name: &t.name,
                    description: &t.description,
                    input_schema: &t.input_schema,
                })
                .collect(),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("delegate_search"));
        assert!(json.contains("\"system\":\"You are a supervisor.\""));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_fast() {
        let oracle = AnthropicOracle::new(LlmConfig {
            api_key: String::new(),
            ..Default::default()
        })
        .unwrap();

        let result = oracle
            .next_turn("system", &[ChatMessage::user("hi")], &[])
            .await;
        assert!(matches!(result, Err(ClickshopError::LlmFailure(_))));
    }
}
