// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Sitebot workspace.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who produced a stored message.
///
/// `Function` rows are tool-call audit records. They are stored alongside
/// regular messages for compatibility but filtered from every user-facing
/// transcript and from orchestration history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Ai,
    Admin,
    Function,
}

/// The external surface a conversation arrived through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Web,
    Embed,
    Telegram,
}

/// Lifecycle state of a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Ended,
    Archived,
}

/// A persisted conversation.
///
/// At most one conversation exists per (platform_type, platform_chat_id,
/// config_id) tuple; the store enforces this. Conversations are created
/// lazily on the first inbound message -- empty conversations are never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub visitor_name: String,
    pub config_id: Option<i64>,
    pub platform_type: PlatformType,
    pub platform_chat_id: String,
    pub status: ConversationStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// A single persisted message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender: SenderType,
    pub body: String,
    pub created_at: String,
}

/// JSON type of an action parameter in a function-calling schema.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// A single parameter of a configured action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// A named action the model may request via function calling.
///
/// Action names are unique within a configuration and immutable during a
/// single orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ActionParameter>,
}

/// Webhook/tool settings within a chatbot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub webhook_url: String,
    /// HMAC-SHA256 signing secret. Signing is skipped when empty.
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
}

fn default_tool_timeout_secs() -> u64 {
    300
}

/// A chatbot configuration, owned by the admin surface and consumed by the
/// orchestrator, tool gateway, and transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotConfig {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub knowledge: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub telegram_secret: Option<String>,
    /// 64-hex-char opaque token validated by the embed transport.
    #[serde(default)]
    pub embed_token: Option<String>,
    #[serde(default)]
    pub embed_enabled: bool,
}

impl ChatbotConfig {
    /// Returns a minimal configuration with the given id and name.
    pub fn named(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            persona: String::new(),
            knowledge: String::new(),
            system_prompt: None,
            greeting: None,
            tools: ToolSettings::default(),
            telegram_bot_token: None,
            telegram_secret: None,
            embed_token: None,
            embed_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sender_type_round_trips_through_strings() {
        for sender in [
            SenderType::User,
            SenderType::Ai,
            SenderType::Admin,
            SenderType::Function,
        ] {
            let s = sender.to_string();
            assert_eq!(SenderType::from_str(&s).unwrap(), sender);
        }
        assert_eq!(SenderType::Function.to_string(), "function");
    }

    #[test]
    fn platform_type_serde_lowercase() {
        let json = serde_json::to_string(&PlatformType::Telegram).unwrap();
        assert_eq!(json, "\"telegram\"");
        let back: PlatformType = serde_json::from_str("\"embed\"").unwrap();
        assert_eq!(back, PlatformType::Embed);
    }

    #[test]
    fn tool_settings_defaults() {
        let settings: ToolSettings = serde_json::from_str("{}").unwrap();
        assert!(!settings.enabled);
        assert!(settings.webhook_url.is_empty());
        assert_eq!(settings.timeout_secs, 300);
        assert!(settings.actions.is_empty());
    }

    #[test]
    fn action_definition_deserializes_from_config_json() {
        let json = r#"{
            "name": "book_meeting",
            "description": "Book a meeting slot",
            "parameters": [
                {"name": "date", "type": "string", "description": "DD/MM/YYYY", "required": true},
                {"name": "attendees", "type": "integer", "required": false}
            ]
        }"#;
        let action: ActionDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(action.name, "book_meeting");
        assert_eq!(action.parameters.len(), 2);
        assert_eq!(action.parameters[0].kind, ParamType::String);
        assert!(action.parameters[0].required);
        assert!(!action.parameters[1].required);
    }

    #[test]
    fn chatbot_config_named_has_empty_tooling() {
        let config = ChatbotConfig::named(7, "support");
        assert_eq!(config.id, 7);
        assert!(!config.tools.enabled);
        assert!(config.embed_token.is_none());
    }
}
