// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence backends for Sitebot.
//!
//! Provides the SQLite-backed [`SqliteStore`] (conversations, messages,
//! configurations, settings) and the in-process [`MemoryKv`] used for
//! rate-limit counters and the token refresh lock.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
pub use memory::MemoryKv;
