// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI orchestration: system prompts, conversation history, the bounded
//! function-calling loop, and degraded-mode fallbacks.

pub mod fallback;
pub mod orchestrator;
pub mod prompt;

pub use orchestrator::Orchestrator;
