// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool gateway: turns configured actions into function-calling schemas
//! and dispatches the model's tool calls to a signed webhook endpoint.

pub mod extract;
pub mod gateway;
pub mod schema;

pub use extract::extract_message;
pub use gateway::ToolGateway;
pub use schema::{build_function_schemas, is_enabled_for};
