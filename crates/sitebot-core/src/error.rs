// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sitebot chat service.

use thiserror::Error;

/// The primary error type used across all Sitebot store traits and core operations.
#[derive(Debug, Error)]
pub enum SitebotError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Store backend errors (database connection, query failure, serialization).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// LLM gateway errors (transport failure, malformed body, non-200 status).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The gateway rejected our refresh token; stored credentials were wiped
    /// and an operator must re-authorize the installation.
    #[error("reauthorization required: stored AIPass credentials are no longer valid")]
    ReauthorizationRequired,

    /// The gateway reports the account balance is exhausted. Detected
    /// heuristically from error text, so the original message is preserved.
    #[error("budget exceeded: {message}")]
    BudgetExceeded { message: String },

    /// Tool webhook errors (unknown action, non-2xx response, signing failure).
    #[error("tool error: {message}")]
    Tool {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport adapter errors (Telegram send failure, embed token mismatch).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
