// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The inbound webhook route for Telegram updates.
//!
//! Telegram expects a 2xx for every delivered update; anything else
//! triggers redelivery. Pipeline failures are therefore logged and
//! swallowed after the update has been accepted.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use sitebot_core::{ChatbotConfig, ConversationStore, PlatformType};
use sitebot_pipeline::{InboundMessage, MessagePipeline};
use teloxide::prelude::*;
use teloxide::types::{Update, UpdateKind};
use tracing::{debug, warn};

use crate::{secret_matches, send_reply, SECRET_HEADER};

/// Shared state for the Telegram webhook handler.
#[derive(Clone)]
pub struct TelegramState {
    pub pipeline: Arc<MessagePipeline>,
    pub store: Arc<dyn ConversationStore>,
    /// Overrides the Bot API base URL; used by tests.
    pub api_url: Option<String>,
}

/// Builds the Telegram webhook router.
pub fn router(state: TelegramState) -> Router {
    Router::new()
        .route("/telegram/{config_id}/webhook", post(receive_update))
        .with_state(state)
}

/// POST /telegram/{config_id}/webhook
pub async fn receive_update(
    State(state): State<TelegramState>,
    Path(config_id): Path<i64>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    let Ok(Some(config)) = state.store.get_configuration(config_id).await else {
        return StatusCode::NOT_FOUND;
    };

    let header_secret = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if !secret_matches(header_secret, config.telegram_secret.as_deref()) {
        warn!(config_id, "telegram update rejected: secret mismatch");
        return StatusCode::UNAUTHORIZED;
    }

    let UpdateKind::Message(message) = update.kind else {
        // Edited messages, callbacks and the rest are acknowledged and dropped.
        debug!(config_id, "ignoring non-message update");
        return StatusCode::OK;
    };
    let Some(text) = message.text().map(str::to_string) else {
        debug!(config_id, "ignoring non-text message");
        return StatusCode::OK;
    };

    let chat_id = message.chat.id.0;
    let visitor_name = message.from.as_ref().map(|u| u.first_name.clone());

    if let Err(e) = handle_text(&state, &config, chat_id, visitor_name, text).await {
        warn!(config_id, chat_id, error = %e, "telegram update handling failed");
    }
    StatusCode::OK
}

async fn handle_text(
    state: &TelegramState,
    config: &ChatbotConfig,
    chat_id: i64,
    visitor_name: Option<String>,
    text: String,
) -> Result<(), sitebot_core::SitebotError> {
    let outcome = state
        .pipeline
        .handle(
            InboundMessage {
                platform: PlatformType::Telegram,
                platform_chat_id: chat_id.to_string(),
                identifier: format!("tg:{chat_id}"),
                visitor_name,
                body: text,
            },
            config,
        )
        .await?;

    let token = config
        .telegram_bot_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| sitebot_core::SitebotError::Channel {
            message: format!("configuration {} has no telegram bot token", config.id),
            source: None,
        })?;

    let mut bot = Bot::new(token);
    if let Some(api_url) = &state.api_url {
        bot = bot.set_api_url(api_url.parse().map_err(|e| {
            sitebot_core::SitebotError::Channel {
                message: format!("invalid telegram api url: {e}"),
                source: Some(Box::new(e)),
            }
        })?);
    }
    send_reply(&bot, chat_id, &outcome.reply).await
}
