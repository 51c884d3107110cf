// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat-message extraction from automation-tool response bodies.
//!
//! Webhook automation platforms wrap their output in wildly different
//! envelopes. This module digs a human-readable string out of the common
//! shapes; callers fall back to the raw structure when nothing matches.

use serde_json::Value;

const FLAT_KEYS: [&str; 3] = ["message", "output", "result"];

/// Extracts a flat message string from a decoded webhook response.
///
/// Priority order: direct strings win, then well-known top-level keys,
/// then the first element of a top-level array (checked for nested
/// `output[0].content[0].text` shapes before the flat keys), then the
/// same nested shape at the object level. Returns `None` when no flat
/// message is found.
pub fn extract_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            for key in FLAT_KEYS {
                if let Some(Value::String(s)) = map.get(key) {
                    return Some(s.clone());
                }
            }
            nested_text(value)
        }
        Value::Array(items) => {
            let first = items.first()?;
            if let Some(text) = nested_text(first) {
                return Some(text);
            }
            if let Value::Object(map) = first {
                for key in FLAT_KEYS {
                    if let Some(Value::String(s)) = map.get(key) {
                        return Some(s.clone());
                    }
                }
            }
            if let Value::String(s) = first {
                return Some(s.clone());
            }
            None
        }
        _ => None,
    }
}

/// Resolves `output[0].content[0].text`, accepting either a string or an
/// object with a `message` key at the leaf.
fn nested_text(value: &Value) -> Option<String> {
    let text = value
        .get("output")?
        .get(0)?
        .get("content")?
        .get(0)?
        .get("text")?;
    match text {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
