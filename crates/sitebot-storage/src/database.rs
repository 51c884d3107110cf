// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with schema setup and WAL mode.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use sitebot_core::SitebotError;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS conversations (
    id               TEXT PRIMARY KEY,
    visitor_name     TEXT NOT NULL,
    config_id        INTEGER,
    platform_type    TEXT NOT NULL,
    platform_chat_id TEXT NOT NULL,
    status           TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    UNIQUE (platform_type, platform_chat_id, config_id)
);
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
    sender_type     TEXT NOT NULL,
    body            TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_conversation
    ON messages(conversation_id, created_at);
CREATE TABLE IF NOT EXISTS configurations (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    embed_token TEXT,
    json        TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// A handle to the SQLite database used by the store implementations.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if necessary) the database at `path` and applies
    /// the schema.
    pub async fn open(path: &str) -> Result<Self, SitebotError> {
        let parent = std::path::Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            std::fs::create_dir_all(parent).map_err(|e| SitebotError::Store {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and flushes pending writes.
    pub async fn close(&self) -> Result<(), SitebotError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Maps a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> SitebotError {
    SitebotError::Store {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_database_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("open.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/open.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_accepts_bare_filename() {
        let dir = tempdir().unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = Database::open("bare.db").await;
        std::env::set_current_dir(previous).unwrap();

        let db = result.unwrap();
        assert!(dir.path().join("bare.db").exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("twice.db");
        let db1 = Database::open(path.to_str().unwrap()).await.unwrap();
        db1.close().await.unwrap();
        let db2 = Database::open(path.to_str().unwrap()).await.unwrap();
        db2.close().await.unwrap();
    }
}
