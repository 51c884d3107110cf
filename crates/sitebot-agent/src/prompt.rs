// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System prompt composition.
//!
//! Every prompt starts with a datetime context block. The model is not
//! told the date by its training data, and the tool-usage rules in that
//! block are what keep function calls honest, so the block is always
//! prepended regardless of how the rest of the prompt is sourced.

use chrono::Utc;
use chrono_tz::Tz;
use sitebot_config::AgentConfig;
use sitebot_core::ChatbotConfig;

/// Visitor names that mean "we don't actually know who this is".
const PLACEHOLDER_NAMES: [&str; 2] = ["visitor", "guest"];

/// Builds the datetime context block for the configured timezone.
///
/// Unknown timezone strings fall back to UTC rather than failing the
/// request.
pub fn datetime_context(timezone: &str) -> String {
    let tz: Tz = timezone.parse().unwrap_or(chrono_tz::UTC);
    let now = Utc::now().with_timezone(&tz);
    format!(
        "CURRENT DATE AND TIME: {} ({timezone})\n\n\
         TOOL AND DATE RULES:\n\
         - Never state that an action was performed unless a tool call was actually made and returned a result.\n\
         - If a tool call fails, say so; do not pretend it succeeded.\n\
         - Resolve relative dates such as \"tomorrow\" or \"next Friday\" to absolute DD/MM/YYYY dates using the current date above before calling any tool.\n\
         - If a required tool parameter is unknown, ask the user for it instead of guessing.",
        now.format("%A, %d/%m/%Y %H:%M")
    )
}

/// Composes the full system prompt for a chatbot configuration.
pub fn compose_system_prompt(
    config: &ChatbotConfig,
    agent: &AgentConfig,
    visitor_name: Option<&str>,
) -> String {
    let datetime = datetime_context(&agent.timezone);

    let mut prompt = if !config.persona.is_empty() && !config.knowledge.is_empty() {
        format!(
            "{datetime}\n\n{}\n\n### KNOWLEDGE BASE ###\n{}\n\n\
             Answer strictly from the knowledge base above when it covers the question. \
             Stay in character and keep replies concise.",
            config.persona, config.knowledge
        )
    } else if let Some(system_prompt) = config
        .system_prompt
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        format!("{datetime}\n\n{system_prompt}")
    } else {
        format!(
            "{datetime}\n\nYou are a helpful assistant for {}. {}",
            agent.site_name, agent.site_description
        )
    };

    if let Some(name) = visitor_name
        .map(str::trim)
        .filter(|n| !n.is_empty() && !PLACEHOLDER_NAMES.contains(&n.to_lowercase().as_str()))
    {
        prompt.push_str(&format!(
            "\n\n### CURRENT USER INFORMATION ###\n\
             The visitor's name is {name}. Address them by it naturally \
             and do not ask for their name again."
        ));
    }

    prompt
}
