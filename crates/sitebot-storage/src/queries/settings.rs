// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settings key-value operations.

use rusqlite::{params, OptionalExtension};
use sitebot_core::SitebotError;

use crate::database::{map_tr_err, Database};

/// Get a setting value.
pub async fn get_setting(db: &Database, key: &str) -> Result<Option<String>, SitebotError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
        .map_err(map_tr_err)
}

/// Set a setting value, replacing any previous value.
pub async fn set_setting(db: &Database, key: &str, value: &str) -> Result<(), SitebotError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a setting.
pub async fn delete_setting(db: &Database, key: &str) -> Result<(), SitebotError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
