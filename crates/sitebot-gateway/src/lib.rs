// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embed REST surface: the thin HTTP transport between the website chat
//! widget and the message pipeline. All routes validate an opaque
//! per-configuration embed token; session identity arrives via the
//! X-Session-ID header or a body field.

pub mod handlers;
pub mod server;

pub use server::{router, GatewayState};

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::{Path, State};
    use axum::http::HeaderMap;
    use axum::Json;
    use sitebot_aipass::{AipassClient, TokenManager};
    use sitebot_config::StorageConfig;
    use sitebot_core::{ChatbotConfig, ConversationStatus, ConversationStore, PlatformType};
    use sitebot_pipeline::MessagePipeline;
    use sitebot_ratelimit::RateLimiter;
    use sitebot_storage::{MemoryKv, SqliteStore};
    use sitebot_test_utils::{
        test_agent_config, test_aipass_config, test_rate_limits, MemorySettings,
    };
    use sitebot_tools::ToolGateway;

    use crate::handlers::{self, EmbedMessageRequest, EmbedSessionRequest};
    use crate::GatewayState;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    struct Harness {
        state: GatewayState,
        store: Arc<SqliteStore>,
        _tmp: tempfile::TempDir,
    }

    /// Builds a state wired to an unreachable gateway; with no token the
    /// orchestrator answers in degraded mode, which transport tests rely on.
    async fn harness() -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(StorageConfig {
            database_path: tmp.path().join("test.db").to_string_lossy().into_owned(),
        }));
        store.initialize().await.unwrap();

        let kv = Arc::new(MemoryKv::new());
        let tokens = Arc::new(
            TokenManager::new(
                "http://127.0.0.1:1",
                "client-123",
                Arc::new(MemorySettings::default()),
                kv.clone(),
            )
            .unwrap(),
        );
        let client = Arc::new(
            AipassClient::new("http://127.0.0.1:1", Duration::from_secs(30), tokens.clone())
                .unwrap(),
        );
        let orchestrator = Arc::new(sitebot_agent::Orchestrator::new(
            client,
            tokens,
            Arc::new(ToolGateway::new("example.com").unwrap()),
            store.clone(),
            test_agent_config(),
            test_aipass_config("http://127.0.0.1:1"),
        ));
        let limiter = Arc::new(RateLimiter::new(kv, test_rate_limits()));
        let pipeline = Arc::new(MessagePipeline::new(limiter, orchestrator, store.clone()));

        let mut config = ChatbotConfig::named(1, "support");
        config.embed_token = Some(TOKEN.to_string());
        config.embed_enabled = true;
        config.greeting = Some("Hi {name}, welcome to Example!".to_string());
        store.put_configuration(&config).await.unwrap();

        Harness {
            state: GatewayState {
                pipeline,
                store: store.clone(),
            },
            store,
            _tmp: tmp,
        }
    }

    fn session_headers(session: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-session-id", session.parse().unwrap());
        headers
    }

    #[test]
    fn token_shape_is_enforced() {
        assert!(handlers::is_well_formed_token(TOKEN));
        assert!(!handlers::is_well_formed_token("short"));
        assert!(!handlers::is_well_formed_token(&"g".repeat(64)));
        assert!(!handlers::is_well_formed_token(&format!("{TOKEN}00")));
    }

    #[test]
    fn greeting_substitutes_visitor_name() {
        let mut config = ChatbotConfig::named(1, "support");
        config.greeting = Some("Hi {name}!".to_string());
        assert_eq!(handlers::render_greeting(&config, Some("Alice")), "Hi Alice!");
        assert_eq!(handlers::render_greeting(&config, None), "Hi there!");

        config.greeting = None;
        assert!(!handlers::render_greeting(&config, None).is_empty());
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let h = harness().await;
        let bad = "f".repeat(64);
        let result =
            handlers::get_widget_config(State(h.state.clone()), Path(bad)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn disabled_embed_is_indistinguishable_from_unknown() {
        let h = harness().await;
        let mut config = h.store.get_configuration(1).await.unwrap().unwrap();
        config.embed_enabled = false;
        h.store.put_configuration(&config).await.unwrap();

        let result =
            handlers::get_widget_config(State(h.state.clone()), Path(TOKEN.to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn init_renders_greeting_without_creating_conversation() {
        let h = harness().await;
        let Json(response) = handlers::post_init(
            State(h.state.clone()),
            Path(TOKEN.to_string()),
            session_headers("sess-1"),
            Some(Json(EmbedSessionRequest {
                session_id: None,
                visitor_name: Some("Alice".to_string()),
            })),
        )
        .await
        .unwrap();

        assert_eq!(response.greeting, "Hi Alice, welcome to Example!");
        assert!(response.conversation_id.is_none());
        assert!(h
            .store
            .find_conversation(PlatformType::Embed, "sess-1", Some(1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn message_flow_creates_conversation_and_filters_audit_rows() {
        let h = harness().await;
        let Json(response) = handlers::post_message(
            State(h.state.clone()),
            Path(TOKEN.to_string()),
            None,
            session_headers("sess-2"),
            Json(EmbedMessageRequest {
                message: "Hello".to_string(),
                session_id: None,
                visitor_name: Some("Alice".to_string()),
            }),
        )
        .await
        .unwrap();

        assert!(!response.reply.is_empty());
        assert!(!response.rate_limited);
        let conversation_id = response.conversation_id.unwrap();

        // Add an internal audit row; the transcript must not expose it.
        h.store
            .add_message(&sitebot_core::StoredMessage {
                id: "audit-1".to_string(),
                conversation_id: conversation_id.clone(),
                sender: sitebot_core::SenderType::Function,
                body: "🔧 Function Call: ping".to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            })
            .await
            .unwrap();

        let Json(transcript) = handlers::get_messages(
            State(h.state.clone()),
            Path(TOKEN.to_string()),
            session_headers("sess-2"),
        )
        .await
        .unwrap();
        assert_eq!(transcript.len(), 2);
        assert!(transcript.iter().all(|m| m.sender != "function"));
    }

    #[tokio::test]
    async fn missing_session_id_is_a_bad_request() {
        let h = harness().await;
        let result = handlers::post_message(
            State(h.state.clone()),
            Path(TOKEN.to_string()),
            None,
            HeaderMap::new(),
            Json(EmbedMessageRequest {
                message: "Hello".to_string(),
                session_id: None,
                visitor_name: None,
            }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn end_transitions_conversation_status() {
        let h = harness().await;
        let Json(response) = handlers::post_message(
            State(h.state.clone()),
            Path(TOKEN.to_string()),
            None,
            session_headers("sess-3"),
            Json(EmbedMessageRequest {
                message: "Hello".to_string(),
                session_id: None,
                visitor_name: None,
            }),
        )
        .await
        .unwrap();
        let conversation_id = response.conversation_id.unwrap();

        handlers::post_end(
            State(h.state.clone()),
            Path(TOKEN.to_string()),
            session_headers("sess-3"),
            None,
        )
        .await
        .unwrap();

        let conversation = h
            .store
            .get_conversation(&conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.status, ConversationStatus::Ended);
    }
}
