// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth2 token lifecycle for the AIPass gateway.
//!
//! One credential set exists per installation. Refreshes are serialized
//! through a TTL lock in the key-value store so that concurrent requests
//! on one install (or across nodes) trigger exactly one network refresh;
//! everyone else waits for the lock and re-reads the persisted state.

use std::sync::Arc;
use std::time::Duration;

use sitebot_core::{KvStore, SettingsStore, SitebotError};
use tracing::{debug, info, warn};

use crate::types::TokenResponse;

/// Settings keys for persisted token state.
const KEY_ACCESS_TOKEN: &str = "aipass.access_token";
const KEY_REFRESH_TOKEN: &str = "aipass.refresh_token";
const KEY_TOKEN_EXPIRY: &str = "aipass.token_expiry";

/// Global refresh lock; one refresh in flight per install, not per token.
const REFRESH_LOCK_KEY: &str = "aipass:refresh_lock";
const REFRESH_LOCK_TTL: Duration = Duration::from_secs(30);
const LOCK_POLL_ATTEMPTS: u32 = 10;
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Access tokens are refreshed this many seconds before their expiry.
const EXPIRY_SKEW_SECS: i64 = 300;

/// Fallback lifetime (30 days) when the gateway omits `expires_in`.
const FALLBACK_EXPIRES_IN_SECS: i64 = 2_592_000;

/// Persisted OAuth2 credential snapshot.
#[derive(Debug, Clone, Default)]
pub struct TokenState {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute epoch seconds; 0 means "no recorded expiry".
    pub expiry: i64,
}

impl TokenState {
    /// True when the access token is usable without a refresh attempt.
    fn usable_at(&self, now: i64) -> bool {
        !self.access_token.is_empty() && (self.expiry == 0 || now < self.expiry - EXPIRY_SKEW_SECS)
    }
}

/// Owns the OAuth2 access/refresh token pair for the gateway.
pub struct TokenManager {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    settings: Arc<dyn SettingsStore>,
    kv: Arc<dyn KvStore>,
}

impl TokenManager {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        settings: Arc<dyn SettingsStore>,
        kv: Arc<dyn KvStore>,
    ) -> Result<Self, SitebotError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SitebotError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            client_id: client_id.into(),
            settings,
            kv,
        })
    }

    /// Reads the persisted token state.
    pub async fn state(&self) -> Result<TokenState, SitebotError> {
        let access_token = self
            .settings
            .get(KEY_ACCESS_TOKEN)
            .await?
            .unwrap_or_default();
        let refresh_token = self
            .settings
            .get(KEY_REFRESH_TOKEN)
            .await?
            .unwrap_or_default();
        let expiry = self
            .settings
            .get(KEY_TOKEN_EXPIRY)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        Ok(TokenState {
            access_token,
            refresh_token,
            expiry,
        })
    }

    /// True iff a usable access token is held, refreshing first when the
    /// current one is inside its pre-expiry window or already expired.
    pub async fn is_connected(&self) -> Result<bool, SitebotError> {
        let state = self.state().await?;
        if state.access_token.is_empty() {
            return Ok(false);
        }
        if state.usable_at(now_epoch()) {
            return Ok(true);
        }
        match self.refresh().await {
            Ok(()) => Ok(true),
            Err(SitebotError::ReauthorizationRequired) => Ok(false),
            Err(e) => {
                warn!(error = %e, "token refresh failed during connectivity check");
                Ok(false)
            }
        }
    }

    /// Returns a bearer token, refreshing when necessary.
    pub async fn bearer_token(&self) -> Result<String, SitebotError> {
        let state = self.state().await?;
        if state.access_token.is_empty() {
            return Err(SitebotError::ReauthorizationRequired);
        }
        if state.usable_at(now_epoch()) {
            return Ok(state.access_token);
        }
        self.refresh().await?;
        let refreshed = self.state().await?;
        if refreshed.access_token.is_empty() {
            return Err(SitebotError::ReauthorizationRequired);
        }
        Ok(refreshed.access_token)
    }

    /// Refreshes the access token through the gateway's token endpoint.
    ///
    /// Serialized by a TTL lock: losers of the lock race poll for release
    /// and re-read the persisted state, skipping the network call when
    /// the winner already produced a valid token.
    pub async fn refresh(&self) -> Result<(), SitebotError> {
        let mut acquired = self
            .kv
            .set_nx(REFRESH_LOCK_KEY, "1", REFRESH_LOCK_TTL)
            .await?;

        if !acquired {
            debug!("refresh lock held elsewhere, polling");
            for _ in 0..LOCK_POLL_ATTEMPTS {
                tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                if self.state().await?.usable_at(now_epoch()) {
                    debug!("token refreshed by concurrent holder");
                    return Ok(());
                }
                acquired = self
                    .kv
                    .set_nx(REFRESH_LOCK_KEY, "1", REFRESH_LOCK_TTL)
                    .await?;
                if acquired {
                    break;
                }
            }
        }

        // Holder may have finished between our last poll and acquisition.
        if self.state().await?.usable_at(now_epoch()) {
            if acquired {
                self.kv.delete(REFRESH_LOCK_KEY).await?;
            }
            return Ok(());
        }

        let result = self.refresh_inner().await;
        if acquired {
            self.kv.delete(REFRESH_LOCK_KEY).await?;
        }
        result
    }

    async fn refresh_inner(&self) -> Result<(), SitebotError> {
        let state = self.state().await?;
        if state.refresh_token.is_empty() {
            return Err(SitebotError::ReauthorizationRequired);
        }

        let url = format!("{}/oauth2/token", self.base_url);
        let body = serde_json::json!({
            "grant_type": "refresh_token",
            "refresh_token": state.refresh_token,
            "client_id": self.client_id,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SitebotError::Provider {
                message: format!("token refresh request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            warn!(status = %status, "refresh token rejected, clearing credentials");
            self.disconnect().await?;
            return Err(SitebotError::ReauthorizationRequired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SitebotError::Provider {
                message: format!("token endpoint returned {status}: {body}"),
                source: None,
            });
        }

        let token: TokenResponse =
            response.json().await.map_err(|e| SitebotError::Provider {
                message: format!("malformed token response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let expires_in = match token.expires_in {
            Some(secs) => secs,
            None => {
                warn!(
                    fallback_secs = FALLBACK_EXPIRES_IN_SECS,
                    "gateway omitted expires_in, assuming 30-day lifetime"
                );
                FALLBACK_EXPIRES_IN_SECS
            }
        };
        let expiry = now_epoch() + expires_in;

        self.settings.set(KEY_ACCESS_TOKEN, &token.access_token).await?;
        let refresh_token = token
            .refresh_token
            .filter(|t| !t.is_empty())
            .unwrap_or(state.refresh_token);
        self.settings.set(KEY_REFRESH_TOKEN, &refresh_token).await?;
        self.settings.set(KEY_TOKEN_EXPIRY, &expiry.to_string()).await?;

        info!(expiry, "access token refreshed");
        Ok(())
    }

    /// Wipes all persisted credentials, forcing operator re-authorization.
    pub async fn disconnect(&self) -> Result<(), SitebotError> {
        self.settings.delete(KEY_ACCESS_TOKEN).await?;
        self.settings.delete(KEY_REFRESH_TOKEN).await?;
        self.settings.delete(KEY_TOKEN_EXPIRY).await?;
        Ok(())
    }

    /// Seeds token state directly, for initial authorization or tests.
    pub async fn store_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
        expiry: i64,
    ) -> Result<(), SitebotError> {
        self.settings.set(KEY_ACCESS_TOKEN, access_token).await?;
        self.settings.set(KEY_REFRESH_TOKEN, refresh_token).await?;
        self.settings.set(KEY_TOKEN_EXPIRY, &expiry.to_string()).await?;
        Ok(())
    }
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
