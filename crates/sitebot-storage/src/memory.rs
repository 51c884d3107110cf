// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process key-value store with TTL semantics.
//!
//! Single-node stand-in for an external store such as Redis. Per-key
//! atomicity comes from dashmap's entry locking; expiry is evaluated
//! lazily on access, so a crashed lock holder self-heals once the TTL
//! passes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use sitebot_core::{KvStore, SitebotError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Dashmap-backed [`KvStore`] implementation.
#[derive(Default)]
pub struct MemoryKv {
    map: DashMap<String, Entry>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, SitebotError> {
        // The read guard is dropped when the match ends, before any removal.
        let expired = match self.map.get(key) {
            Some(entry) if !entry.expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.map.remove(key);
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), SitebotError> {
        self.map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|t| Instant::now() + t),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SitebotError> {
        self.map.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, SitebotError> {
        let mut entry = self.map.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: Some(Instant::now() + ttl),
        });
        if entry.expired() {
            // Window elapsed: restart the counter and its TTL.
            entry.value = "0".to_string();
            entry.expires_at = Some(Instant::now() + ttl);
        }
        let current: i64 = entry.value.parse().unwrap_or(0);
        let next = current + 1;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn set_nx(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, SitebotError> {
        let mut acquired = false;
        let mut entry = self.map.entry(key.to_string()).or_insert_with(|| {
            acquired = true;
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            }
        });
        if !acquired && entry.expired() {
            entry.value = value.to_string();
            entry.expires_at = Some(Instant::now() + ttl);
            acquired = true;
        }
        Ok(acquired)
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<u64, SitebotError> {
        let keys: Vec<String> = self
            .map
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        let count = keys.len() as u64;
        for key in keys {
            self.map.remove(&key);
        }
        Ok(count)
    }
}
