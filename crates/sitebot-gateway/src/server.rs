// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embed HTTP server built on axum.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sitebot_core::ConversationStore;
use sitebot_pipeline::MessagePipeline;
use tower_http::cors::CorsLayer;

use crate::handlers;

/// Shared state for embed request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<MessagePipeline>,
    pub store: Arc<dyn ConversationStore>,
}

/// Builds the embed router. Split out so tests can drive handlers
/// without binding a socket.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/embed/{token}/config", get(handlers::get_widget_config))
        .route("/embed/{token}/init", post(handlers::post_init))
        .route("/embed/{token}/message", post(handlers::post_message))
        .route("/embed/{token}/messages", get(handlers::get_messages))
        .route("/embed/{token}/end", post(handlers::post_end))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
