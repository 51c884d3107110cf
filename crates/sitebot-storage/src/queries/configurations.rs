// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatbot configuration storage.
//!
//! Configurations are stored as a JSON blob plus indexed lookup columns
//! (name, embed_token). The admin surface owns writes; the pipeline only
//! reads.

use rusqlite::{params, OptionalExtension};
use sitebot_core::types::ChatbotConfig;
use sitebot_core::SitebotError;

use crate::database::{map_tr_err, Database};

fn decode(json: String) -> Result<ChatbotConfig, rusqlite::Error> {
    serde_json::from_str(&json)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Insert or replace a configuration, returning its id.
pub async fn put_configuration(
    db: &Database,
    config: &ChatbotConfig,
) -> Result<i64, SitebotError> {
    let mut config = config.clone();
    db.connection()
        .call(move |conn| {
            if config.id <= 0 {
                conn.execute(
                    "INSERT INTO configurations (name, embed_token, json) VALUES (?1, ?2, '{}')",
                    params![config.name, config.embed_token],
                )?;
                config.id = conn.last_insert_rowid();
            }
            let json = serde_json::to_string(&config).map_err(|e| {
                rusqlite::Error::ToSqlConversionFailure(Box::new(e))
            })?;
            conn.execute(
                "INSERT INTO configurations (id, name, embed_token, json)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    embed_token = excluded.embed_token,
                    json = excluded.json",
                params![config.id, config.name, config.embed_token, json],
            )?;
            Ok(config.id)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a configuration by id.
pub async fn get_configuration(
    db: &Database,
    id: i64,
) -> Result<Option<ChatbotConfig>, SitebotError> {
    db.connection()
        .call(move |conn| {
            let json: Option<String> = conn
                .query_row(
                    "SELECT json FROM configurations WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            json.map(decode).transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Get a configuration by name.
pub async fn get_configuration_by_name(
    db: &Database,
    name: &str,
) -> Result<Option<ChatbotConfig>, SitebotError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let json: Option<String> = conn
                .query_row(
                    "SELECT json FROM configurations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;
            json.map(decode).transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Get a configuration by its embed token.
pub async fn get_configuration_by_embed_token(
    db: &Database,
    token: &str,
) -> Result<Option<ChatbotConfig>, SitebotError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            let json: Option<String> = conn
                .query_row(
                    "SELECT json FROM configurations WHERE embed_token = ?1",
                    params![token],
                    |row| row.get(0),
                )
                .optional()?;
            json.map(decode).transpose()
        })
        .await
        .map_err(map_tr_err)
}
