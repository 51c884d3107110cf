// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./sitebot.toml` > `~/.config/sitebot/sitebot.toml`
//! > `/etc/sitebot/sitebot.toml` with environment variable overrides via the
//! `SITEBOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SitebotConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sitebot/sitebot.toml` (system-wide)
/// 3. `~/.config/sitebot/sitebot.toml` (user XDG config)
/// 4. `./sitebot.toml` (local directory)
/// 5. `SITEBOT_*` environment variables
pub fn load_config() -> Result<SitebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SitebotConfig::default()))
        .merge(Toml::file("/etc/sitebot/sitebot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sitebot/sitebot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sitebot.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<SitebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SitebotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SitebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SitebotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SITEBOT_RATE_LIMIT_PER_MINUTE` must map
/// to `rate_limit.per_minute`, not `rate.limit_per_minute`.
fn env_provider() -> Env {
    Env::prefixed("SITEBOT_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("aipass_", "aipass.", 1)
            .replacen("rate_limit_", "rate_limit.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}
