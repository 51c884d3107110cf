// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation and settings store traits.

use async_trait::async_trait;

use crate::error::SitebotError;
use crate::types::{ChatbotConfig, Conversation, PlatformType, StoredMessage};

/// Persistence seam for conversations, messages, and chatbot configurations.
///
/// Implementations must enforce the uniqueness of
/// (platform_type, platform_chat_id, config_id) across conversations and
/// bump `updated_at` whenever a message is added.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persists a new conversation.
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), SitebotError>;

    /// Fetches a conversation by id.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SitebotError>;

    /// Finds the conversation for an external chat session, if one exists.
    async fn find_conversation(
        &self,
        platform: PlatformType,
        platform_chat_id: &str,
        config_id: Option<i64>,
    ) -> Result<Option<Conversation>, SitebotError>;

    /// Appends a message and bumps the conversation's `updated_at`.
    async fn add_message(&self, message: &StoredMessage) -> Result<(), SitebotError>;

    /// Returns messages for a conversation in chronological order.
    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<StoredMessage>, SitebotError>;

    /// Transitions a conversation to `ended`.
    async fn end_conversation(&self, id: &str) -> Result<(), SitebotError>;

    /// Fetches a chatbot configuration by id.
    async fn get_configuration(&self, id: i64) -> Result<Option<ChatbotConfig>, SitebotError>;

    /// Fetches a chatbot configuration by name.
    async fn get_configuration_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ChatbotConfig>, SitebotError>;

    /// Fetches a chatbot configuration by its embed token.
    async fn get_configuration_by_embed_token(
        &self,
        token: &str,
    ) -> Result<Option<ChatbotConfig>, SitebotError>;

    /// Inserts or replaces a configuration, returning its id.
    ///
    /// Configurations are owned by the admin surface; this exists for
    /// seeding and tests.
    async fn put_configuration(&self, config: &ChatbotConfig) -> Result<i64, SitebotError>;
}

/// Key-value settings persistence (model defaults, OAuth2 token state).
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns the stored value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, SitebotError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), SitebotError>;

    /// Removes `key` if present.
    async fn delete(&self, key: &str) -> Result<(), SitebotError>;
}
