// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use std::str::FromStr;

use rusqlite::params;
use sitebot_core::types::{Conversation, ConversationStatus, PlatformType};
use sitebot_core::SitebotError;

use crate::database::{map_tr_err, Database};

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let platform: String = row.get(3)?;
    let status: String = row.get(5)?;
    Ok(Conversation {
        id: row.get(0)?,
        visitor_name: row.get(1)?,
        config_id: row.get(2)?,
        platform_type: PlatformType::from_str(&platform).unwrap_or(PlatformType::Web),
        platform_chat_id: row.get(4)?,
        status: ConversationStatus::from_str(&status).unwrap_or(ConversationStatus::Active),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const SELECT_COLS: &str = "id, visitor_name, config_id, platform_type, platform_chat_id,
                           status, created_at, updated_at";

/// Insert a new conversation.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), SitebotError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations
                 (id, visitor_name, config_id, platform_type, platform_chat_id,
                  status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    c.id,
                    c.visitor_name,
                    c.config_id,
                    c.platform_type.to_string(),
                    c.platform_chat_id,
                    c.status.to_string(),
                    c.created_at,
                    c.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, SitebotError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLS} FROM conversations WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], row_to_conversation)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find the conversation for an external chat session, if any.
pub async fn find_conversation(
    db: &Database,
    platform: PlatformType,
    platform_chat_id: &str,
    config_id: Option<i64>,
) -> Result<Option<Conversation>, SitebotError> {
    let platform = platform.to_string();
    let chat_id = platform_chat_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLS} FROM conversations
                 WHERE platform_type = ?1 AND platform_chat_id = ?2
                   AND config_id IS ?3"
            ))?;
            let mut rows = stmt.query_map(params![platform, chat_id, config_id], row_to_conversation)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Bump a conversation's `updated_at`.
pub async fn touch_conversation(
    db: &Database,
    id: &str,
    updated_at: &str,
) -> Result<(), SitebotError> {
    let id = id.to_string();
    let updated_at = updated_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![updated_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Transition a conversation to `ended`.
pub async fn end_conversation(db: &Database, id: &str) -> Result<(), SitebotError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET status = 'ended' WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
