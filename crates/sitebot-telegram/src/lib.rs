// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram webhook adapter.
//!
//! Each configuration carries its own bot token and webhook secret.
//! Inbound updates are validated against the secret header, routed
//! through the message pipeline, and answered with `sendMessage`.

pub mod webhook;

pub use webhook::{router, TelegramState};

use sitebot_core::SitebotError;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::debug;

/// Header Telegram sends when a webhook was registered with a secret.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Compares the secret header against the configured webhook secret.
/// A configuration without a secret accepts every update.
pub fn secret_matches(header_value: Option<&str>, configured: Option<&str>) -> bool {
    match configured.filter(|s| !s.is_empty()) {
        Some(expected) => header_value == Some(expected),
        // No secret configured means the webhook was registered without one.
        None => true,
    }
}

/// Sends a plain-text reply to a Telegram chat.
pub async fn send_reply(bot: &Bot, chat_id: i64, text: &str) -> Result<(), SitebotError> {
    bot.send_message(ChatId(chat_id), text)
        .await
        .map_err(|e| SitebotError::Channel {
            message: format!("telegram sendMessage failed: {e}"),
            source: Some(Box::new(e)),
        })?;
    debug!(chat_id, "telegram reply sent");
    Ok(())
}
