/// LLM Client — the single point of entry for all Claude API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Everything goes through the `ModelClient` trait so the orchestrator and
/// tools can be driven by a scripted model in tests.
///
/// Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent drift)
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::conversation::{blocks_text, ContentBlock, Message, MessageContent, Role};
use crate::models::tool::{ParameterSchema, ToolDefinition};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Provider-neutral request / response
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

impl ModelResponse {
    pub fn text(&self) -> String {
        blocks_text(&self.content)
    }
}

/// Anything that can answer a `ModelRequest`. One attempt per call: callers
/// decide what a failure means, nothing here retries.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError>;
}

/// Single-prompt completion whose text must be JSON, deserialized into `T`.
/// The prompt must instruct the model to return valid JSON.
pub async fn call_json<T: DeserializeOwned>(
    client: &dyn ModelClient,
    prompt: &str,
    system: &str,
    max_tokens: u32,
) -> Result<T, LlmError> {
    let request = ModelRequest {
        system: system.to_string(),
        messages: vec![Message::user(prompt)],
        tools: Vec::new(),
        max_tokens,
    };
    let response = client.send(&request).await?;

    let text = response.text();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }

    // Strip markdown code fences if the model wraps JSON in them
    serde_json::from_str(strip_json_fences(&text)).map_err(LlmError::Parse)
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: AnthropicContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent<'a> {
    Text(&'a str),
    Blocks(Vec<AnthropicBlock<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock<'a> {
    Text {
        text: &'a str,
    },
    ToolUse {
        id: &'a str,
        name: &'a str,
        input: &'a Value,
    },
    ToolResult {
        tool_use_id: &'a str,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a ParameterSchema,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ResponseBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

fn to_wire_block(block: &ContentBlock) -> AnthropicBlock<'_> {
    match block {
        ContentBlock::Text { text } => AnthropicBlock::Text { text },
        ContentBlock::ToolUse { id, name, input } => AnthropicBlock::ToolUse { id, name, input },
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
            ..
        } => AnthropicBlock::ToolResult {
            tool_use_id,
            content: match content {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            is_error: *is_error,
        },
    }
}

/// System-role messages are not accepted in `messages`; they are folded into
/// the system prompt instead.
fn build_wire_request(request: &ModelRequest) -> AnthropicRequest<'_> {
    let mut system = request.system.clone();
    let mut messages = Vec::with_capacity(request.messages.len());

    for message in &request.messages {
        let role = match message.role {
            Role::System => {
                system.push_str("\n\n");
                system.push_str(&message.text());
                continue;
            }
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        let content = match &message.content {
            MessageContent::PlainText(text) => AnthropicContent::Text(text),
            MessageContent::Blocks(blocks) => {
                AnthropicContent::Blocks(blocks.iter().map(to_wire_block).collect())
            }
        };
        messages.push(AnthropicMessage { role, content });
    }

    AnthropicRequest {
        model: MODEL,
        max_tokens: request.max_tokens,
        system,
        messages,
        tools: request
            .tools
            .iter()
            .map(|t| AnthropicTool {
                name: &t.name,
                description: &t.description,
                input_schema: &t.input_schema,
            })
            .collect(),
    }
}

impl From<AnthropicResponse> for ModelResponse {
    fn from(response: AnthropicResponse) -> Self {
        let content = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
                ResponseBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                ResponseBlock::Other => None,
            })
            .collect();
        Self {
            content,
            stop_reason: response.stop_reason,
            usage: response.usage,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmClient
// ────────────────────────────────────────────────────────────────────────────

/// The Anthropic Messages API client used by the service.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, ANTHROPIC_API_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl ModelClient for LlmClient {
    /// Makes one call to the Claude API. Errors are returned as-is; rate
    /// limits and 5xx responses are not retried here.
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        let body = build_wire_request(request);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("LLM API returned {}: {}", status, message);
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited(message));
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response: AnthropicResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}, stop_reason={:?}",
            response.usage.input_tokens, response.usage.output_tokens, response.stop_reason
        );

        Ok(response.into())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
