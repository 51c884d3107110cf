// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sitebot chat service.
//!
//! This crate provides the foundational error type, domain types, and the
//! trait seams (conversation store, settings store, key-value store) shared
//! by the rest of the workspace.

pub mod error;
pub mod traits;
pub mod types;

pub use error::SitebotError;
pub use traits::{ConversationStore, KvStore, SettingsStore};
pub use types::{
    ActionDefinition, ActionParameter, ChatbotConfig, Conversation, ConversationStatus,
    ParamType, PlatformType, SenderType, StoredMessage, ToolSettings,
};
