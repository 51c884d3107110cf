// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-identifier and global rate limiting.
//!
//! Counters are fixed windows with TTL expiry behind the [`KvStore`] seam
//! (a token-bucket approximation, not an exact sliding window). Check and
//! increment are separate phases: the pipeline checks before doing any
//! work and increments only after the exchange was persisted, so a
//! rejected or failed request never consumes quota.

pub mod identifier;

use std::sync::Arc;
use std::time::Duration;

use sitebot_config::model::RateLimitConfig;
use sitebot_core::{KvStore, SitebotError};
use tracing::debug;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);
const DAY: Duration = Duration::from_secs(86_400);

const KEY_PREFIX: &str = "ratelimit:";

/// Outcome of a rate-limit check.
///
/// Every rejection carries a user-facing message that the caller surfaces
/// verbatim with HTTP 429 semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    MessageTooLong { max_length: usize, actual_length: usize },
    MinuteLimit,
    HourLimit,
    DayLimit,
    GlobalMinuteLimit,
    GlobalHourLimit,
}

impl RateLimitDecision {
    /// Returns `true` when the message may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }

    /// Human-readable explanation shown to the end user.
    pub fn message(&self) -> String {
        match self {
            RateLimitDecision::Allowed => String::new(),
            RateLimitDecision::MessageTooLong {
                max_length,
                actual_length,
            } => format!(
                "Your message is too long ({actual_length} characters). \
                 Please keep it under {max_length} characters."
            ),
            RateLimitDecision::MinuteLimit => {
                "You're sending messages too quickly. Please wait a minute and try again."
                    .to_string()
            }
            RateLimitDecision::HourLimit => {
                "You've reached the hourly message limit. Please try again later.".to_string()
            }
            RateLimitDecision::DayLimit => {
                "You've reached the daily message limit. Please come back tomorrow.".to_string()
            }
            RateLimitDecision::GlobalMinuteLimit | RateLimitDecision::GlobalHourLimit => {
                "The chat is receiving a lot of messages right now. Please try again in a moment."
                    .to_string()
            }
        }
    }
}

/// Rate limiter over expiring KV counters.
pub struct RateLimiter {
    kv: Arc<dyn KvStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(kv: Arc<dyn KvStore>, config: RateLimitConfig) -> Self {
        Self { kv, config }
    }

    /// Checks whether `identifier` may send `body`, without consuming quota.
    ///
    /// Checks short-circuit in order: message length, per-identifier
    /// minute/hour/day windows, then global minute/hour windows.
    pub async fn check(
        &self,
        identifier: &str,
        body: &str,
    ) -> Result<RateLimitDecision, SitebotError> {
        let length = body.chars().count();
        if length > self.config.max_message_length {
            return Ok(RateLimitDecision::MessageTooLong {
                max_length: self.config.max_message_length,
                actual_length: length,
            });
        }

        let checks: [(String, u32, RateLimitDecision); 5] = [
            (
                id_key(identifier, "minute"),
                self.config.per_minute,
                RateLimitDecision::MinuteLimit,
            ),
            (
                id_key(identifier, "hour"),
                self.config.per_hour,
                RateLimitDecision::HourLimit,
            ),
            (
                id_key(identifier, "day"),
                self.config.per_day,
                RateLimitDecision::DayLimit,
            ),
            (
                global_key("minute"),
                self.config.global_per_minute,
                RateLimitDecision::GlobalMinuteLimit,
            ),
            (
                global_key("hour"),
                self.config.global_per_hour,
                RateLimitDecision::GlobalHourLimit,
            ),
        ];

        for (key, limit, rejection) in checks {
            let count = self.read_counter(&key).await?;
            if count >= i64::from(limit) {
                debug!(identifier, key = key.as_str(), count, limit, "rate limit hit");
                return Ok(rejection);
            }
        }

        Ok(RateLimitDecision::Allowed)
    }

    /// Consumes one unit of quota for `identifier` in every window.
    ///
    /// Increments are per-counter atomic but not transactional across
    /// counters; an off-by-one between windows under contention is
    /// accepted.
    pub async fn increment(&self, identifier: &str) -> Result<(), SitebotError> {
        self.kv.incr(&id_key(identifier, "minute"), MINUTE).await?;
        self.kv.incr(&id_key(identifier, "hour"), HOUR).await?;
        self.kv.incr(&id_key(identifier, "day"), DAY).await?;
        self.kv.incr(&global_key("minute"), MINUTE).await?;
        self.kv.incr(&global_key("hour"), HOUR).await?;
        Ok(())
    }

    /// Administrative bulk-clear of all counters.
    pub async fn reset(&self) -> Result<u64, SitebotError> {
        let removed = self.kv.clear_prefix(KEY_PREFIX).await?;
        debug!(removed, "rate limit counters cleared");
        Ok(removed)
    }

    async fn read_counter(&self, key: &str) -> Result<i64, SitebotError> {
        Ok(self
            .kv
            .get(key)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }
}

fn id_key(identifier: &str, window: &str) -> String {
    format!("{KEY_PREFIX}id:{identifier}:{window}")
}

fn global_key(window: &str) -> String {
    format!("{KEY_PREFIX}global:{window}")
}
