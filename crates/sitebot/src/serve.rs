// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sitebot serve` command implementation.
//!
//! The composition root: builds the store, key-value layer, token
//! manager, gateway client, tool gateway, rate limiter, orchestrator,
//! and message pipeline exactly once, then serves the embed REST
//! surface and Telegram webhook routes from a single listener.

use std::sync::Arc;
use std::time::Duration;

use sitebot_agent::Orchestrator;
use sitebot_aipass::{AipassClient, TokenManager};
use sitebot_config::SitebotConfig;
use sitebot_core::SitebotError;
use sitebot_gateway::GatewayState;
use sitebot_pipeline::MessagePipeline;
use sitebot_ratelimit::RateLimiter;
use sitebot_storage::{MemoryKv, SqliteStore};
use sitebot_telegram::TelegramState;
use sitebot_tools::ToolGateway;
use tracing::info;

/// Runs the `sitebot serve` command until the process is terminated.
pub async fn run_serve(config: SitebotConfig) -> Result<(), SitebotError> {
    init_tracing(&config.agent.log_level);
    info!("starting sitebot serve");

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let kv = Arc::new(MemoryKv::new());

    let tokens = Arc::new(TokenManager::new(
        &config.aipass.base_url,
        &config.aipass.client_id,
        store.clone(),
        kv.clone(),
    )?);
    match tokens.is_connected().await {
        Ok(true) => info!("AIPass gateway connected"),
        Ok(false) => info!("no valid AIPass token, serving degraded-mode replies"),
        Err(e) => tracing::warn!(error = %e, "AIPass connectivity check failed"),
    }

    let client = Arc::new(AipassClient::new(
        &config.aipass.base_url,
        Duration::from_secs(config.aipass.completion_timeout_secs),
        tokens.clone(),
    )?);

    let tool_gateway = Arc::new(ToolGateway::new(&config.agent.site_name)?);
    let limiter = Arc::new(RateLimiter::new(kv.clone(), config.rate_limit.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        client,
        tokens,
        tool_gateway,
        store.clone(),
        config.agent.clone(),
        config.aipass.clone(),
    ));

    let pipeline = Arc::new(MessagePipeline::new(
        limiter,
        orchestrator,
        store.clone(),
    ));

    let embed = sitebot_gateway::router(GatewayState {
        pipeline: pipeline.clone(),
        store: store.clone(),
    });
    let telegram = sitebot_telegram::router(TelegramState {
        pipeline,
        store: store.clone(),
        api_url: None,
    });
    let app = embed.merge(telegram);

    let bind_addr = config.gateway.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| SitebotError::Channel {
            message: format!("failed to bind to {bind_addr}: {e}"),
            source: Some(Box::new(e)),
        })?;
    info!("listening on {bind_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| SitebotError::Channel {
        message: format!("server error: {e}"),
        source: Some(Box::new(e)),
    })?;

    store.close().await?;
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sitebot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
