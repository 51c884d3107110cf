// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AIPass gateway integration: OAuth2 token lifecycle and HTTP transport
//! for chat completions, usage queries, and audio endpoints.

pub mod client;
pub mod token;
pub mod types;

pub use client::AipassClient;
pub use token::{TokenManager, TokenState};
pub use types::{
    ChatMessage, CompletionRequest, CompletionResult, FunctionCall, FunctionSchema, TokenUsage,
    ToolCall, ToolDefinition, UsageSummary,
};
