// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps configured actions to OpenAI function-calling schemas.

use serde_json::{json, Map, Value};
use sitebot_aipass::{FunctionSchema, ToolDefinition};
use sitebot_core::ChatbotConfig;

/// True iff the configuration can dispatch tool calls: tools enabled,
/// a webhook URL present, and at least one action defined.
pub fn is_enabled_for(config: &ChatbotConfig) -> bool {
    config.tools.enabled
        && !config.tools.webhook_url.is_empty()
        && !config.tools.actions.is_empty()
}

/// Builds one function schema per configured action.
pub fn build_function_schemas(config: &ChatbotConfig) -> Vec<ToolDefinition> {
    config
        .tools
        .actions
        .iter()
        .map(|action| {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for param in &action.parameters {
                properties.insert(
                    param.name.clone(),
                    json!({
                        "type": param.kind.to_string(),
                        "description": param.description,
                    }),
                );
                if param.required {
                    required.push(Value::String(param.name.clone()));
                }
            }
            ToolDefinition {
                def_type: "function".to_string(),
                function: FunctionSchema {
                    name: action.name.clone(),
                    description: action.description.clone(),
                    parameters: json!({
                        "type": "object",
                        "properties": properties,
                        "required": required,
                    }),
                },
            }
        })
        .collect()
}
