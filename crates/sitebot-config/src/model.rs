// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sitebot chat service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Sitebot configuration.
///
/// Loaded from TOML files with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SitebotConfig {
    /// Site identity and prompt defaults.
    #[serde(default)]
    pub agent: AgentConfig,

    /// AIPass gateway settings.
    #[serde(default)]
    pub aipass: AipassConfig,

    /// Rate limit thresholds.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embed/Telegram HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Site identity and prompt defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the site, used in fallback prompts.
    #[serde(default = "default_site_name")]
    pub site_name: String,

    /// Short site description for the generic fallback system prompt.
    #[serde(default)]
    pub site_description: String,

    /// IANA timezone name used in the datetime context block.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            site_name: default_site_name(),
            site_description: String::new(),
            timezone: default_timezone(),
            log_level: default_log_level(),
        }
    }
}

fn default_site_name() -> String {
    "sitebot".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// AIPass gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AipassConfig {
    /// Base URL of the AIPass gateway.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// OAuth2 client id registered with the gateway.
    #[serde(default)]
    pub client_id: String,

    /// Default model to use for completion requests.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature passed to the gateway.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Timeout for completion and usage calls, in seconds.
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,
}

impl Default for AipassConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_id: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            completion_timeout_secs: default_completion_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.aipass.dev".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_completion_timeout_secs() -> u64 {
    30
}

/// Rate limit thresholds (see the rate limiter for window semantics).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Maximum message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Per-identifier message cap in a trailing 60s window.
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,

    /// Per-identifier message cap in a trailing 3600s window.
    #[serde(default = "default_per_hour")]
    pub per_hour: u32,

    /// Per-identifier message cap in a trailing 86400s window.
    #[serde(default = "default_per_day")]
    pub per_day: u32,

    /// Global (all identifiers) cap in a trailing 60s window.
    #[serde(default = "default_global_per_minute")]
    pub global_per_minute: u32,

    /// Global (all identifiers) cap in a trailing 3600s window.
    #[serde(default = "default_global_per_hour")]
    pub global_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_message_length: default_max_message_length(),
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
            per_day: default_per_day(),
            global_per_minute: default_global_per_minute(),
            global_per_hour: default_global_per_hour(),
        }
    }
}

fn default_max_message_length() -> usize {
    500
}

fn default_per_minute() -> u32 {
    5
}

fn default_per_hour() -> u32 {
    20
}

fn default_per_day() -> u32 {
    50
}

fn default_global_per_minute() -> u32 {
    30
}

fn default_global_per_hour() -> u32 {
    200
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("sitebot").join("sitebot.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "sitebot.db".to_string())
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address the embed/Telegram HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8438".to_string()
}
