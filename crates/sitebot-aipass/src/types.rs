// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AIPass gateway request/response types.
//!
//! The gateway speaks an OpenAI-compatible chat-completion dialect, plus
//! a `{success, data}` envelope for its usage and model-listing endpoints.

use serde::{Deserialize, Serialize};
use sitebot_core::SitebotError;

// --- Chat completion types ---

/// A single message in the completion request conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", "assistant", or "tool".
    pub role: String,

    /// Text content. Absent on assistant turns that only carry tool calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool calls issued by the assistant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Links a "tool" role message back to the call it answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Creates a plain text message for the given role.
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates an assistant turn carrying raw tool calls.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Creates a "tool" role message answering a specific tool call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call identifier.
    pub id: String,
    /// Call type, always "function".
    #[serde(rename = "type")]
    pub call_type: String,
    /// The function being invoked.
    pub function: FunctionCall,
}

/// The function half of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name as declared in the schema.
    pub name: String,
    /// JSON-encoded argument object, as a raw string.
    pub arguments: String,
}

/// An OpenAI-style function schema passed with completion requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Schema type, always "function".
    #[serde(rename = "type")]
    pub def_type: String,
    /// The function declaration.
    pub function: FunctionSchema,
}

/// A function declaration within a [`ToolDefinition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Function name exposed to the model.
    pub name: String,
    /// Human-readable description of what the function does.
    pub description: String,
    /// JSON Schema object describing the parameters.
    pub parameters: serde_json::Value,
}

/// A chat completion request body.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,

    /// Conversation messages, system prompt first.
    pub messages: Vec<ChatMessage>,

    /// Always false; streaming is not used.
    pub stream: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Function schemas available to the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Raw completion response body.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: ChatMessage,
}

/// Token accounting reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Flattened completion result handed to callers.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    /// Assistant text content, empty when the turn is tool calls only.
    pub content: String,
    /// Tool calls requested by the model, empty when none.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage if the gateway reported it.
    pub usage: Option<TokenUsage>,
    /// Model that produced the response.
    pub model: String,
}

impl CompletionResult {
    /// Flattens the first choice of a raw response.
    pub fn from_response(response: CompletionResponse) -> Result<Self, SitebotError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SitebotError::Provider {
                message: "completion response contained no choices".to_string(),
                source: None,
            })?;
        Ok(Self {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            usage: response.usage,
            model: response.model.unwrap_or_default(),
        })
    }
}

// --- Envelope and error types ---

/// The `{success, data, message}` envelope used by usage endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Account usage summary from the gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageSummary {
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    /// Fields the gateway adds without notice.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Structured error body, when the gateway bothers to send one.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// OAuth2 token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Audio transcription response.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

/// Classifies a gateway error body into the crate error taxonomy.
///
/// Budget exhaustion is detected from the message text as well as the
/// declared type, because the gateway is inconsistent about which one
/// it sets. The text match is a documented best-effort heuristic.
pub fn classify_provider_error(status: u16, body: &str) -> SitebotError {
    let (error_type, message) = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => (
            parsed.error.error_type.unwrap_or_default(),
            parsed.error.message.unwrap_or_else(|| body.to_string()),
        ),
        Err(_) => (String::new(), body.to_string()),
    };

    let lowered = message.to_lowercase();
    if error_type == "budget_exceeded"
        || lowered.contains("budget")
        || lowered.contains("balance")
        || lowered.contains("insufficient")
    {
        return SitebotError::BudgetExceeded { message };
    }

    SitebotError::Provider {
        message: format!("gateway returned {status}: {message}"),
        source: None,
    }
}
