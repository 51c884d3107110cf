// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Sitebot chat service.
//!
//! Layered TOML + environment loading via Figment, with a strict serde
//! model that rejects unknown keys.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AgentConfig, AipassConfig, GatewayConfig, RateLimitConfig, SitebotConfig, StorageConfig,
};
