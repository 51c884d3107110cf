// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles and fixtures shared across Sitebot test suites.
//!
//! Provides [`MemorySettings`], an in-memory [`SettingsStore`] used
//! wherever token state or settings need to exist without a database,
//! and fixture builders for common configuration values.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sitebot_config::{AgentConfig, AipassConfig, RateLimitConfig};
use sitebot_core::{SettingsStore, SitebotError};

/// In-memory settings store backed by a mutexed map.
#[derive(Default)]
pub struct MemorySettings {
    map: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get(&self, key: &str) -> Result<Option<String>, SitebotError> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SitebotError> {
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SitebotError> {
        self.map.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Agent configuration for an imaginary example site.
pub fn test_agent_config() -> AgentConfig {
    AgentConfig {
        site_name: "Example".to_string(),
        site_description: "An example site".to_string(),
        timezone: "UTC".to_string(),
        log_level: "info".to_string(),
    }
}

/// AIPass configuration pointed at the given base URL.
pub fn test_aipass_config(base_url: &str) -> AipassConfig {
    AipassConfig {
        base_url: base_url.to_string(),
        client_id: "client-123".to_string(),
        model: "gpt-4o-mini".to_string(),
        max_tokens: 256,
        temperature: 0.7,
        completion_timeout_secs: 30,
    }
}

/// The default rate-limit thresholds.
pub fn test_rate_limits() -> RateLimitConfig {
    RateLimitConfig {
        max_message_length: 500,
        per_minute: 5,
        per_hour: 20,
        per_day: 50,
        global_per_minute: 30,
        global_per_hour: 200,
    }
}
