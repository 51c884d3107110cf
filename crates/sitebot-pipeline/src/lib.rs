// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The inbound message pipeline.
//!
//! Side effects are strictly ordered: rate-limit check (no mutation),
//! conversation resolution, user message persisted, orchestration
//! (external calls only), assistant message persisted, counters
//! incremented. A crash mid-orchestration leaves the user's message
//! durably recorded even when no reply was generated.

use std::sync::Arc;

use sitebot_agent::Orchestrator;
use sitebot_core::{
    ChatbotConfig, Conversation, ConversationStatus, ConversationStore, PlatformType, SenderType,
    SitebotError, StoredMessage,
};
use sitebot_ratelimit::RateLimiter;
use tracing::{debug, info};

/// One inbound chat message with its session identity.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub platform: PlatformType,
    /// External session key (embed session id, Telegram chat id).
    pub platform_chat_id: String,
    /// Rate-limit identifier, typically `ip` or `ip:session`.
    pub identifier: String,
    pub visitor_name: Option<String>,
    pub body: String,
}

/// Pipeline outcome returned to the transport layer.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    /// User-facing reply text.
    pub reply: String,
    /// Set when a conversation exists; rate-limited requests that never
    /// reached conversation resolution carry `None`.
    pub conversation_id: Option<String>,
    /// True when the reply is a rate-limit explanation.
    pub rate_limited: bool,
}

/// Sequential middleware chain handling one inbound message.
pub struct MessagePipeline {
    limiter: Arc<RateLimiter>,
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn ConversationStore>,
}

impl MessagePipeline {
    pub fn new(
        limiter: Arc<RateLimiter>,
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            limiter,
            orchestrator,
            store,
        }
    }

    /// Handles one inbound message end to end.
    pub async fn handle(
        &self,
        message: InboundMessage,
        config: &ChatbotConfig,
    ) -> Result<PipelineResponse, SitebotError> {
        let body = message.body.trim();
        if body.is_empty() {
            return Err(SitebotError::Channel {
                message: "empty message body".to_string(),
                source: None,
            });
        }
        if message.platform_chat_id.is_empty() || message.identifier.is_empty() {
            return Err(SitebotError::Channel {
                message: "missing session identifier".to_string(),
                source: None,
            });
        }

        let decision = self.limiter.check(&message.identifier, body).await?;
        if !decision.is_allowed() {
            debug!(identifier = %message.identifier, "message rejected by rate limiter");
            return Ok(PipelineResponse {
                reply: decision.message(),
                conversation_id: None,
                rate_limited: true,
            });
        }

        let conversation = self.resolve_conversation(&message, config).await?;

        self.persist(&conversation.id, SenderType::User, body).await?;

        let reply = self
            .orchestrator
            .generate_response(
                &conversation.id,
                body,
                config,
                message.visitor_name.as_deref(),
            )
            .await;

        self.persist(&conversation.id, SenderType::Ai, &reply).await?;

        self.limiter.increment(&message.identifier).await?;

        info!(conversation_id = %conversation.id, "message handled");
        Ok(PipelineResponse {
            reply,
            conversation_id: Some(conversation.id),
            rate_limited: false,
        })
    }

    /// Resolves an existing conversation for the session or creates one.
    ///
    /// Creation happens here, on the first message, and nowhere else;
    /// sessions that never send a message leave no conversation behind.
    async fn resolve_conversation(
        &self,
        message: &InboundMessage,
        config: &ChatbotConfig,
    ) -> Result<Conversation, SitebotError> {
        let config_id = (config.id > 0).then_some(config.id);
        if let Some(existing) = self
            .store
            .find_conversation(message.platform, &message.platform_chat_id, config_id)
            .await?
        {
            return Ok(existing);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            visitor_name: message
                .visitor_name
                .clone()
                .unwrap_or_else(|| "Visitor".to_string()),
            config_id,
            platform_type: message.platform,
            platform_chat_id: message.platform_chat_id.clone(),
            status: ConversationStatus::Active,
            created_at: now.clone(),
            updated_at: now,
        };
        self.store.create_conversation(&conversation).await?;
        info!(conversation_id = %conversation.id, platform = %message.platform, "conversation created");
        Ok(conversation)
    }

    async fn persist(
        &self,
        conversation_id: &str,
        sender: SenderType,
        body: &str,
    ) -> Result<(), SitebotError> {
        let message = StoredMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender,
            body: body.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.store.add_message(&message).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sitebot_aipass::{AipassClient, TokenManager};
    use sitebot_config::{RateLimitConfig, StorageConfig};
    use sitebot_storage::{MemoryKv, SqliteStore};
    use sitebot_test_utils::{
        test_agent_config, test_aipass_config, test_rate_limits, MemorySettings,
    };
    use sitebot_tools::ToolGateway;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct Harness {
        pipeline: MessagePipeline,
        store: Arc<SqliteStore>,
        tokens: Arc<TokenManager>,
        _tmp: tempfile::TempDir,
    }

    async fn harness(gateway_url: &str, rate_limit: RateLimitConfig) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(StorageConfig {
            database_path: tmp.path().join("test.db").to_string_lossy().into_owned(),
        }));
        store.initialize().await.unwrap();

        let kv = Arc::new(MemoryKv::new());
        let tokens = Arc::new(
            TokenManager::new(
                gateway_url,
                "client-123",
                Arc::new(MemorySettings::default()),
                kv.clone(),
            )
            .unwrap(),
        );
        let client = Arc::new(
            AipassClient::new(gateway_url, Duration::from_secs(30), tokens.clone()).unwrap(),
        );
        let orchestrator = Arc::new(sitebot_agent::Orchestrator::new(
            client,
            tokens.clone(),
            Arc::new(ToolGateway::new("example.com").unwrap()),
            store.clone(),
            test_agent_config(),
            test_aipass_config(gateway_url),
        ));
        let limiter = Arc::new(RateLimiter::new(kv, rate_limit));
        let pipeline = MessagePipeline::new(limiter, orchestrator, store.clone());
        Harness {
            pipeline,
            store,
            tokens,
            _tmp: tmp,
        }
    }

    fn inbound(body: &str) -> InboundMessage {
        InboundMessage {
            platform: PlatformType::Web,
            platform_chat_id: "sess-1".to_string(),
            identifier: "203.0.113.7:sess-1".to_string(),
            visitor_name: Some("Alice".to_string()),
            body: body.to_string(),
        }
    }

    fn default_limits() -> RateLimitConfig {
        test_rate_limits()
    }

    async fn mount_completion(server: &MockServer, content: &str) {
        Mock::given(method("POST"))
            .and(path("/oauth2/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": content}}],
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn empty_body_is_rejected_before_any_side_effect() {
        let h = harness("http://127.0.0.1:1", default_limits()).await;
        let config = ChatbotConfig::named(1, "support");
        h.store.put_configuration(&config).await.unwrap();

        let err = h.pipeline.handle(inbound("   "), &config).await.unwrap_err();
        assert!(matches!(err, SitebotError::Channel { .. }));
    }

    #[tokio::test]
    async fn first_message_creates_exactly_one_conversation() {
        let server = MockServer::start().await;
        mount_completion(&server, "Hi Alice!").await;

        let h = harness(&server.uri(), default_limits()).await;
        h.tokens
            .store_tokens("tok", "refresh", chrono::Utc::now().timestamp() + 3600)
            .await
            .unwrap();
        let config = ChatbotConfig::named(1, "support");
        h.store.put_configuration(&config).await.unwrap();

        // No conversation exists before the first message.
        assert!(h
            .store
            .find_conversation(PlatformType::Web, "sess-1", Some(1))
            .await
            .unwrap()
            .is_none());

        let first = h.pipeline.handle(inbound("Hello"), &config).await.unwrap();
        let second = h.pipeline.handle(inbound("Again"), &config).await.unwrap();
        assert_eq!(first.conversation_id, second.conversation_id);

        let conversation_id = first.conversation_id.unwrap();
        let messages = h.store.get_messages(&conversation_id, None).await.unwrap();
        // Two user turns and two assistant turns, in order.
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].sender, SenderType::User);
        assert_eq!(messages[0].body, "Hello");
        assert_eq!(messages[1].sender, SenderType::Ai);
        assert_eq!(messages[1].body, "Hi Alice!");
    }

    #[tokio::test]
    async fn rate_limited_message_is_not_persisted() {
        let server = MockServer::start().await;
        mount_completion(&server, "ok").await;

        let mut limits = default_limits();
        limits.per_minute = 1;
        let h = harness(&server.uri(), limits).await;
        h.tokens
            .store_tokens("tok", "refresh", chrono::Utc::now().timestamp() + 3600)
            .await
            .unwrap();
        let config = ChatbotConfig::named(1, "support");
        h.store.put_configuration(&config).await.unwrap();

        let first = h.pipeline.handle(inbound("one"), &config).await.unwrap();
        assert!(!first.rate_limited);

        let second = h.pipeline.handle(inbound("two"), &config).await.unwrap();
        assert!(second.rate_limited);
        assert!(second.conversation_id.is_none());
        assert!(!second.reply.is_empty());

        let conversation_id = first.conversation_id.unwrap();
        let messages = h.store.get_messages(&conversation_id, None).await.unwrap();
        assert_eq!(messages.len(), 2, "rejected message must not be persisted");
    }

    #[tokio::test]
    async fn overlong_message_is_rejected_with_explanation() {
        let h = harness("http://127.0.0.1:1", default_limits()).await;
        let config = ChatbotConfig::named(1, "support");
        h.store.put_configuration(&config).await.unwrap();

        let long = "x".repeat(501);
        let result = h.pipeline.handle(inbound(&long), &config).await.unwrap();
        assert!(result.rate_limited);
        assert!(result.reply.contains("500"), "got: {}", result.reply);
    }

    #[tokio::test]
    async fn degraded_mode_still_persists_turns() {
        // Disconnected system: canned reply, but the exchange is recorded.
        let h = harness("http://127.0.0.1:1", default_limits()).await;
        let config = ChatbotConfig::named(1, "support");
        h.store.put_configuration(&config).await.unwrap();

        let result = h.pipeline.handle(inbound("Hello"), &config).await.unwrap();
        assert!(!result.reply.is_empty());

        let messages = h
            .store
            .get_messages(&result.conversation_id.unwrap(), None)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, SenderType::Ai);
    }
}
