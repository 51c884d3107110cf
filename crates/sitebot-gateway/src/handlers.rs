// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the embed REST surface.

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use sitebot_core::{ChatbotConfig, PlatformType, SenderType, SitebotError};
use sitebot_pipeline::InboundMessage;
use sitebot_ratelimit::identifier::{client_ip, rate_limit_identifier};
use std::net::SocketAddr;
use tracing::debug;

use crate::server::GatewayState;

const SESSION_HEADER: &str = "x-session-id";

const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

/// Request body for POST /embed/{token}/message.
#[derive(Debug, Deserialize)]
pub struct EmbedMessageRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub visitor_name: Option<String>,
}

/// Request body for POST /embed/{token}/init and /end.
#[derive(Debug, Default, Deserialize)]
pub struct EmbedSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub visitor_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WidgetConfigResponse {
    pub name: String,
    pub greeting: String,
}

#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub greeting: String,
    /// Present only when the session already has a conversation.
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmbedMessageResponse {
    pub reply: String,
    pub conversation_id: Option<String>,
    pub rate_limited: bool,
}

#[derive(Debug, Serialize)]
pub struct TranscriptMessage {
    pub sender: String,
    pub body: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Transport-level rejection with an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<SitebotError> for ApiError {
    fn from(err: SitebotError) -> Self {
        match err {
            SitebotError::Channel { message, .. } => Self::new(StatusCode::BAD_REQUEST, message),
            other => {
                // Internal detail stays in the logs, not the response.
                tracing::error!(error = %other, "embed request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Validates the opaque embed token and resolves its configuration.
///
/// Tokens are 64 hex characters; anything else is rejected before the
/// store is consulted. Unknown tokens and disabled embeds both return
/// 404 so the widget cannot probe for configurations.
async fn resolve_embed_config(
    state: &GatewayState,
    token: &str,
) -> Result<ChatbotConfig, ApiError> {
    if !is_well_formed_token(token) {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "unknown embed token"));
    }
    let config = state
        .store
        .get_configuration_by_embed_token(token)
        .await?
        .filter(|c| c.embed_enabled)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "unknown embed token"))?;
    Ok(config)
}

pub(crate) fn is_well_formed_token(token: &str) -> bool {
    token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit())
}

/// Session id from the X-Session-ID header, falling back to the body.
fn session_id(headers: &HeaderMap, from_body: Option<&str>) -> Result<String, ApiError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| from_body.map(str::to_string))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "missing session id"))
}

/// Renders the configured greeting, substituting the visitor name.
pub(crate) fn render_greeting(config: &ChatbotConfig, visitor_name: Option<&str>) -> String {
    let template = config
        .greeting
        .as_deref()
        .filter(|g| !g.is_empty())
        .unwrap_or(DEFAULT_GREETING);
    match visitor_name.filter(|n| !n.trim().is_empty()) {
        Some(name) => template.replace("{name}", name.trim()),
        None => template.replace("{name}", "there"),
    }
}

/// GET /embed/{token}/config
pub async fn get_widget_config(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
) -> Result<Json<WidgetConfigResponse>, ApiError> {
    let config = resolve_embed_config(&state, &token).await?;
    Ok(Json(WidgetConfigResponse {
        greeting: render_greeting(&config, None),
        name: config.name,
    }))
}

/// POST /embed/{token}/init
///
/// Returns the rendered greeting and any existing conversation for the
/// session. Never creates a conversation; that happens lazily on the
/// first message.
pub async fn post_init(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Option<Json<EmbedSessionRequest>>,
) -> Result<Json<InitResponse>, ApiError> {
    let config = resolve_embed_config(&state, &token).await?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let session = session_id(&headers, body.session_id.as_deref())?;

    let existing = state
        .store
        .find_conversation(PlatformType::Embed, &session, Some(config.id))
        .await?;

    debug!(session, existing = existing.is_some(), "embed widget initialized");
    Ok(Json(InitResponse {
        greeting: render_greeting(&config, body.visitor_name.as_deref()),
        conversation_id: existing.map(|c| c.id),
    }))
}

/// POST /embed/{token}/message
pub async fn post_message(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    connect_info: Option<axum::Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
    Json(body): Json<EmbedMessageRequest>,
) -> Result<Json<EmbedMessageResponse>, ApiError> {
    let config = resolve_embed_config(&state, &token).await?;
    let session = session_id(&headers, body.session_id.as_deref())?;

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let peer = connect_info.map(|axum::Extension(ConnectInfo(addr))| addr.to_string());
    let ip = client_ip(forwarded, peer.as_deref());

    let outcome = state
        .pipeline
        .handle(
            InboundMessage {
                platform: PlatformType::Embed,
                platform_chat_id: session.clone(),
                identifier: rate_limit_identifier(&ip, Some(&session)),
                visitor_name: body.visitor_name,
                body: body.message,
            },
            &config,
        )
        .await?;

    Ok(Json(EmbedMessageResponse {
        reply: outcome.reply,
        conversation_id: outcome.conversation_id,
        rate_limited: outcome.rate_limited,
    }))
}

/// GET /embed/{token}/messages
///
/// Returns the session transcript in chronological order. Function-call
/// audit rows are internal and never shown to the widget.
pub async fn get_messages(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<TranscriptMessage>>, ApiError> {
    let config = resolve_embed_config(&state, &token).await?;
    let session = session_id(&headers, None)?;

    let Some(conversation) = state
        .store
        .find_conversation(PlatformType::Embed, &session, Some(config.id))
        .await?
    else {
        return Ok(Json(Vec::new()));
    };

    let messages = state.store.get_messages(&conversation.id, None).await?;
    let transcript = messages
        .into_iter()
        .filter(|m| m.sender != SenderType::Function)
        .map(|m| TranscriptMessage {
            sender: m.sender.to_string(),
            body: m.body,
            created_at: m.created_at,
        })
        .collect();
    Ok(Json(transcript))
}

/// POST /embed/{token}/end
pub async fn post_end(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Option<Json<EmbedSessionRequest>>,
) -> Result<StatusCode, ApiError> {
    let config = resolve_embed_config(&state, &token).await?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let session = session_id(&headers, body.session_id.as_deref())?;

    if let Some(conversation) = state
        .store
        .find_conversation(PlatformType::Embed, &session, Some(config.id))
        .await?
    {
        state.store.end_conversation(&conversation.id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
