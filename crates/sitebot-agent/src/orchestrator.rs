// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The response state machine: prompt, history, completion, tool rounds.
//!
//! `generate_response` never returns an error. Every failure path
//! resolves to user-facing text: canned degraded-mode replies when no
//! valid token is held, a fixed balance message on budget exhaustion,
//! and a generic apology for everything else.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use sitebot_aipass::{AipassClient, ChatMessage, CompletionRequest, CompletionResult, TokenManager};
use sitebot_config::{AgentConfig, AipassConfig};
use sitebot_core::{ChatbotConfig, ConversationStore, SenderType, SitebotError, StoredMessage};
use sitebot_tools::ToolGateway;
use tracing::{debug, info, warn};

use crate::fallback;
use crate::prompt;

/// Upper bound on completion/tool round-trips per response.
const MAX_TOOL_ROUNDS: usize = 10;

/// How many non-function history messages feed the prompt.
const HISTORY_LIMIT: usize = 10;

/// History rows fetched before function messages are filtered out.
const HISTORY_FETCH_LIMIT: i64 = 30;

/// Audit messages truncate tool results to this many characters.
const AUDIT_RESULT_LIMIT: usize = 500;

/// Drives prompt composition, the completion call, and the bounded
/// function-calling loop for one inbound message.
pub struct Orchestrator {
    client: Arc<AipassClient>,
    tokens: Arc<TokenManager>,
    gateway: Arc<ToolGateway>,
    store: Arc<dyn ConversationStore>,
    agent: AgentConfig,
    aipass: AipassConfig,
}

impl Orchestrator {
    pub fn new(
        client: Arc<AipassClient>,
        tokens: Arc<TokenManager>,
        gateway: Arc<ToolGateway>,
        store: Arc<dyn ConversationStore>,
        agent: AgentConfig,
        aipass: AipassConfig,
    ) -> Self {
        Self {
            client,
            tokens,
            gateway,
            store,
            agent,
            aipass,
        }
    }

    /// Produces the assistant reply for the latest message in a
    /// conversation. Always resolves to a string.
    pub async fn generate_response(
        &self,
        conversation_id: &str,
        latest_message: &str,
        config: &ChatbotConfig,
        visitor_name: Option<&str>,
    ) -> String {
        let connected = match self.tokens.is_connected().await {
            Ok(connected) => connected,
            Err(e) => {
                warn!(error = %e, "connectivity check failed, using degraded mode");
                false
            }
        };
        if !connected {
            debug!(conversation_id, "no valid gateway token, degraded-mode reply");
            return fallback::canned_reply(latest_message);
        }

        match self
            .run(conversation_id, latest_message, config, visitor_name)
            .await
        {
            Ok(content) => content,
            Err(SitebotError::BudgetExceeded { message }) => {
                warn!(conversation_id, provider_message = %message, "budget exhausted");
                fallback::BUDGET_MESSAGE.to_string()
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "response generation failed");
                fallback::apology()
            }
        }
    }

    async fn run(
        &self,
        conversation_id: &str,
        latest_message: &str,
        config: &ChatbotConfig,
        visitor_name: Option<&str>,
    ) -> Result<String, SitebotError> {
        let system = prompt::compose_system_prompt(config, &self.agent, visitor_name);
        let mut messages = vec![ChatMessage::text("system", system)];

        let history = self
            .store
            .get_messages(conversation_id, Some(HISTORY_FETCH_LIMIT))
            .await?;
        let non_function: Vec<&StoredMessage> = history
            .iter()
            .filter(|m| m.sender != SenderType::Function)
            .collect();
        let tail_start = non_function.len().saturating_sub(HISTORY_LIMIT);
        let tail = &non_function[tail_start..];
        for stored in tail {
            let role = if stored.sender == SenderType::User {
                "user"
            } else {
                "assistant"
            };
            messages.push(ChatMessage::text(role, stored.body.clone()));
        }

        // The pipeline persists the inbound message before calling us, so
        // it is usually already the final history entry. Append only when
        // it is not, to avoid submitting the same turn twice.
        let trimmed = latest_message.trim();
        let already_last = tail
            .last()
            .map(|m| m.sender == SenderType::User && m.body.trim() == trimmed)
            .unwrap_or(false);
        if !already_last {
            messages.push(ChatMessage::text("user", trimmed));
        }

        let tools = if sitebot_tools::is_enabled_for(config) {
            Some(sitebot_tools::build_function_schemas(config))
        } else {
            None
        };

        let mut result = self.complete(&messages, tools.clone()).await?;

        let mut rounds = 0;
        while !result.tool_calls.is_empty() && rounds < MAX_TOOL_ROUNDS {
            rounds += 1;
            info!(
                conversation_id,
                round = rounds,
                calls = result.tool_calls.len(),
                "executing tool calls"
            );
            messages.push(ChatMessage::assistant_tool_calls(result.tool_calls.clone()));

            for call in &result.tool_calls {
                let params: Value = serde_json::from_str(&call.function.arguments)
                    .unwrap_or_else(|_| Value::Object(Map::new()));
                let mut context = Map::new();
                context.insert("conversation_id".to_string(), json!(conversation_id));

                let outcome = self
                    .gateway
                    .execute(config, &call.function.name, params, context)
                    .await;
                let (succeeded, result_value) = match outcome {
                    Ok(value) => (true, value),
                    Err(e) => (false, json!({ "error": e.to_string() })),
                };
                let content = serde_json::to_string(&result_value)
                    .unwrap_or_else(|_| "{}".to_string());

                messages.push(ChatMessage::tool_result(&call.id, &content));
                self.record_audit(
                    conversation_id,
                    &call.function.name,
                    succeeded,
                    &call.function.arguments,
                    &content,
                )
                .await;
            }

            result = self.complete(&messages, tools.clone()).await?;
        }

        if !result.tool_calls.is_empty() {
            warn!(
                conversation_id,
                rounds, "tool round cap reached, returning available content"
            );
        }

        Ok(result.content)
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<Vec<sitebot_aipass::ToolDefinition>>,
    ) -> Result<CompletionResult, SitebotError> {
        let request = CompletionRequest {
            model: self.aipass.model.clone(),
            messages: messages.to_vec(),
            stream: false,
            temperature: Some(f64::from(self.aipass.temperature)),
            max_tokens: Some(self.aipass.max_tokens),
            tools,
        };
        self.client.generate_completion(&request).await
    }

    /// Persists a human-readable audit trail of a tool call. Sender is
    /// `function`, which keeps these rows out of prompt history.
    async fn record_audit(
        &self,
        conversation_id: &str,
        action: &str,
        succeeded: bool,
        arguments: &str,
        result: &str,
    ) {
        let status = if succeeded { "✅" } else { "❌" };
        let truncated = if result.chars().count() > AUDIT_RESULT_LIMIT {
            let mut s: String = result.chars().take(AUDIT_RESULT_LIMIT).collect();
            s.push('…');
            s
        } else {
            result.to_string()
        };
        let body = format!(
            "🔧 Function Call: {action}\nStatus: {status}\nArguments: {arguments}\nResult: {truncated}"
        );
        let message = StoredMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender: SenderType::Function,
            body,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.store.add_message(&message).await {
            warn!(conversation_id, error = %e, "failed to persist tool audit message");
        }
    }
}
