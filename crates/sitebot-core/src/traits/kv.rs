// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store trait with TTL semantics.
//!
//! Rate-limit counters and the token refresh lock live behind this seam.
//! The bundled implementation is in-process; a Redis-backed implementation
//! can provide the same operations for multi-node deployments.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SitebotError;

/// Expiring key-value operations with atomic increment and compare-and-set.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, SitebotError>;

    /// Sets `key` to `value` with an optional expiry.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), SitebotError>;

    /// Removes `key` if present.
    async fn delete(&self, key: &str) -> Result<(), SitebotError>;

    /// Atomically increments the counter at `key` and returns the new value.
    ///
    /// The TTL is applied only when the counter is created, so the window
    /// expires relative to its first increment.
    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, SitebotError>;

    /// Sets `key` only if it does not already exist (lock acquisition).
    /// Returns `true` when the key was set by this call.
    async fn set_nx(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, SitebotError>;

    /// Removes every key starting with `prefix`. Returns the number removed.
    async fn clear_prefix(&self, prefix: &str) -> Result<u64, SitebotError>;
}
