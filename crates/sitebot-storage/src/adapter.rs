// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ConversationStore and SettingsStore traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use sitebot_config::model::StorageConfig;
use sitebot_core::types::{ChatbotConfig, Conversation, PlatformType, StoredMessage};
use sitebot_core::{ConversationStore, SettingsStore, SitebotError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call
/// to [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Opens the database and applies the schema.
    pub async fn initialize(&self) -> Result<(), SitebotError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db.set(db).map_err(|_| SitebotError::Store {
            source: "store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// Flushes pending writes and checkpoints the WAL.
    pub async fn close(&self) -> Result<(), SitebotError> {
        self.db()?.close().await
    }

    fn db(&self) -> Result<&Database, SitebotError> {
        self.db.get().ok_or_else(|| SitebotError::Store {
            source: "store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), SitebotError> {
        queries::conversations::create_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SitebotError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn find_conversation(
        &self,
        platform: PlatformType,
        platform_chat_id: &str,
        config_id: Option<i64>,
    ) -> Result<Option<Conversation>, SitebotError> {
        queries::conversations::find_conversation(self.db()?, platform, platform_chat_id, config_id)
            .await
    }

    async fn add_message(&self, message: &StoredMessage) -> Result<(), SitebotError> {
        let db = self.db()?;
        queries::messages::insert_message(db, message).await?;
        queries::conversations::touch_conversation(
            db,
            &message.conversation_id,
            &message.created_at,
        )
        .await
    }

    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<StoredMessage>, SitebotError> {
        queries::messages::get_messages_for_conversation(self.db()?, conversation_id, limit).await
    }

    async fn end_conversation(&self, id: &str) -> Result<(), SitebotError> {
        queries::conversations::end_conversation(self.db()?, id).await
    }

    async fn get_configuration(&self, id: i64) -> Result<Option<ChatbotConfig>, SitebotError> {
        queries::configurations::get_configuration(self.db()?, id).await
    }

    async fn get_configuration_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ChatbotConfig>, SitebotError> {
        queries::configurations::get_configuration_by_name(self.db()?, name).await
    }

    async fn get_configuration_by_embed_token(
        &self,
        token: &str,
    ) -> Result<Option<ChatbotConfig>, SitebotError> {
        queries::configurations::get_configuration_by_embed_token(self.db()?, token).await
    }

    async fn put_configuration(&self, config: &ChatbotConfig) -> Result<i64, SitebotError> {
        queries::configurations::put_configuration(self.db()?, config).await
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SitebotError> {
        queries::settings::get_setting(self.db()?, key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SitebotError> {
        queries::settings::set_setting(self.db()?, key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), SitebotError> {
        queries::settings::delete_setting(self.db()?, key).await
    }
}
