// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations.

use std::str::FromStr;

use rusqlite::params;
use sitebot_core::types::{SenderType, StoredMessage};
use sitebot_core::SitebotError;

use crate::database::{map_tr_err, Database};

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    let sender: String = row.get(2)?;
    Ok(StoredMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender: SenderType::from_str(&sender).unwrap_or(SenderType::User),
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Insert a new message.
pub async fn insert_message(db: &Database, msg: &StoredMessage) -> Result<(), SitebotError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender_type, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.sender.to_string(),
                    msg.body,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get messages for a conversation in chronological order.
pub async fn get_messages_for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<StoredMessage>, SitebotError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match limit {
                Some(lim) => {
                    // Take the most recent `lim` rows, oldest first.
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, sender_type, body, created_at FROM (
                             SELECT id, conversation_id, sender_type, body, created_at
                             FROM messages WHERE conversation_id = ?1
                             ORDER BY created_at DESC LIMIT ?2
                         ) ORDER BY created_at ASC",
                    )?;
                    let rows = stmt.query_map(params![conversation_id, lim], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, sender_type, body, created_at
                         FROM messages WHERE conversation_id = ?1
                         ORDER BY created_at ASC",
                    )?;
                    let rows = stmt.query_map(params![conversation_id], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::create_conversation;
    use sitebot_core::types::{Conversation, ConversationStatus, PlatformType};
    use tempfile::tempdir;

    async fn setup_db_with_conversation() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("m.db").to_str().unwrap())
            .await
            .unwrap();
        let conversation = Conversation {
            id: "conv-1".to_string(),
            visitor_name: "Visitor".to_string(),
            config_id: None,
            platform_type: PlatformType::Web,
            platform_chat_id: "sess-1".to_string(),
            status: ConversationStatus::Active,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        create_conversation(&db, &conversation).await.unwrap();
        (db, dir)
    }

    fn make_msg(id: &str, sender: SenderType, body: &str, ts: &str) -> StoredMessage {
        StoredMessage {
            id: id.to_string(),
            conversation_id: "conv-1".to_string(),
            sender,
            body: body.to_string(),
            created_at: ts.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_messages_in_order() {
        let (db, _dir) = setup_db_with_conversation().await;

        insert_message(&db, &make_msg("m1", SenderType::User, "hello", "2026-01-01T00:00:01Z"))
            .await
            .unwrap();
        insert_message(&db, &make_msg("m2", SenderType::Ai, "hi there", "2026-01-01T00:00:02Z"))
            .await
            .unwrap();

        let messages = get_messages_for_conversation(&db, "conv-1", None)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[0].sender, SenderType::User);
        assert_eq!(messages[1].sender, SenderType::Ai);
    }

    #[tokio::test]
    async fn limit_returns_most_recent_oldest_first() {
        let (db, _dir) = setup_db_with_conversation().await;

        for i in 0..5 {
            insert_message(
                &db,
                &make_msg(
                    &format!("m{i}"),
                    SenderType::User,
                    &format!("msg {i}"),
                    &format!("2026-01-01T00:00:0{i}Z"),
                ),
            )
            .await
            .unwrap();
        }

        let messages = get_messages_for_conversation(&db, "conv-1", Some(3))
            .await
            .unwrap();
        assert_eq!(messages.len(), 3);
        // Most recent three, in chronological order.
        assert_eq!(messages[0].id, "m2");
        assert_eq!(messages[2].id, "m4");
    }

    #[tokio::test]
    async fn function_audit_rows_round_trip() {
        let (db, _dir) = setup_db_with_conversation().await;

        insert_message(
            &db,
            &make_msg("m1", SenderType::Function, "🔧 Function Call: x", "2026-01-01T00:00:01Z"),
        )
        .await
        .unwrap();

        let messages = get_messages_for_conversation(&db, "conv-1", None)
            .await
            .unwrap();
        assert_eq!(messages[0].sender, SenderType::Function);
    }
}
