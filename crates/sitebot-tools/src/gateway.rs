// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed webhook dispatch for configured actions.

use std::collections::HashMap;
use std::time::Duration;

use hmac::{Hmac, Mac};
use serde_json::{json, Map, Value};
use sha2::Sha256;
use sitebot_core::{ChatbotConfig, SitebotError};
use tracing::{debug, warn};

use crate::extract::extract_message;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the HMAC-SHA256 payload signature.
const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Pseudo-action used by [`ToolGateway::test_connection`].
const TEST_ACTION: &str = "_test_connection";

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Dispatches configured actions to their webhook endpoint.
pub struct ToolGateway {
    http: reqwest::Client,
    site_name: String,
}

impl ToolGateway {
    pub fn new(site_name: impl Into<String>) -> Result<Self, SitebotError> {
        let http = reqwest::Client::builder().build().map_err(|e| {
            SitebotError::Tool {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            }
        })?;
        Ok(Self {
            http,
            site_name: site_name.into(),
        })
    }

    /// Executes a configured action against the webhook endpoint.
    ///
    /// The payload context is enriched with the site identifier, a
    /// timestamp, and the chatbot name. On a 2xx JSON response the flat
    /// message is preferred over the raw structure when one can be
    /// extracted; a non-JSON body is returned verbatim as a string.
    pub async fn execute(
        &self,
        config: &ChatbotConfig,
        action_name: &str,
        params: Value,
        context: Map<String, Value>,
    ) -> Result<Value, SitebotError> {
        if !config
            .tools
            .actions
            .iter()
            .any(|action| action.name == action_name)
        {
            return Err(SitebotError::Tool {
                message: format!("action not found: {action_name}"),
                source: None,
            });
        }

        let mut context = context;
        context.insert("site".to_string(), json!(self.site_name));
        context.insert(
            "timestamp".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );
        context.insert("chatbot".to_string(), json!(config.name));

        let payload = json!({
            "action": action_name,
            "params": params,
            "context": context,
        });

        debug!(action = action_name, url = %config.tools.webhook_url, "dispatching tool call");
        self.post_payload(
            &config.tools.webhook_url,
            &config.tools.secret,
            &config.tools.headers,
            config.tools.timeout_secs,
            &payload,
        )
        .await
    }

    /// Sends a pseudo-action to verify the webhook endpoint is reachable
    /// and accepts our signature.
    pub async fn test_connection(
        &self,
        webhook_url: &str,
        secret: &str,
        headers: &HashMap<String, String>,
    ) -> Result<(), SitebotError> {
        let payload = json!({
            "action": TEST_ACTION,
            "params": {},
            "context": {
                "site": self.site_name,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
        });
        self.post_payload(webhook_url, secret, headers, 60, &payload)
            .await?;
        Ok(())
    }

    async fn post_payload(
        &self,
        url: &str,
        secret: &str,
        headers: &HashMap<String, String>,
        timeout_secs: u64,
        payload: &Value,
    ) -> Result<Value, SitebotError> {
        let body = serde_json::to_string(payload).map_err(|e| SitebotError::Tool {
            message: format!("failed to encode payload: {e}"),
            source: Some(Box::new(e)),
        })?;

        let timeout_secs = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };

        let mut request = self
            .http
            .post(url)
            .timeout(Duration::from_secs(timeout_secs))
            .header("content-type", "application/json");

        if !secret.is_empty() {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body));
        }
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                SitebotError::Timeout {
                    duration: Duration::from_secs(timeout_secs),
                }
            } else {
                SitebotError::Tool {
                    message: format!("webhook request failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(status = %status, "webhook returned error");
            return Err(SitebotError::Tool {
                message: format!("webhook returned {status}: {text}"),
                source: None,
            });
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(decoded) => match extract_message(&decoded) {
                Some(flat) => Ok(Value::String(flat)),
                None => Ok(decoded),
            },
            Err(_) => Ok(Value::String(text)),
        }
    }
}

/// HMAC-SHA256 of the payload body, hex encoded.
fn sign_payload(secret: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use sitebot_core::ActionDefinition;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    fn config_with_webhook(url: &str, secret: &str) -> ChatbotConfig {
        let mut config = ChatbotConfig::named(1, "support");
        config.tools.enabled = true;
        config.tools.webhook_url = format!("{url}/hook");
        config.tools.secret = secret.to_string();
        config.tools.timeout_secs = 30;
        config.tools.actions = vec![ActionDefinition {
            name: "lookup_order".to_string(),
            description: "Looks up an order".to_string(),
            parameters: vec![],
        }];
        config
    }

    #[test]
    fn signature_is_hex_hmac_of_body() {
        let sig = sign_payload("topsecret", r#"{"action":"x"}"#);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        // Deterministic for the same secret and body.
        assert_eq!(sig, sign_payload("topsecret", r#"{"action":"x"}"#));
        assert_ne!(sig, sign_payload("other", r#"{"action":"x"}"#));
    }

    #[tokio::test]
    async fn unknown_action_is_rejected_without_network() {
        let gateway = ToolGateway::new("example.com").unwrap();
        let config = config_with_webhook("http://127.0.0.1:1", "");
        let err = gateway
            .execute(&config, "missing_action", json!({}), Map::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("action not found"), "got: {err}");
    }

    #[tokio::test]
    async fn execute_signs_and_enriches_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header_exists("X-Webhook-Signature"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = ToolGateway::new("example.com").unwrap();
        let config = config_with_webhook(&server.uri(), "topsecret");
        let result = gateway
            .execute(&config, "lookup_order", json!({"order": 7}), Map::new())
            .await
            .unwrap();
        assert_eq!(result, json!("ok"));

        let requests = server.received_requests().await.unwrap();
        let request: &Request = &requests[0];
        let payload: Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(payload["action"], "lookup_order");
        assert_eq!(payload["params"]["order"], 7);
        assert_eq!(payload["context"]["site"], "example.com");
        assert_eq!(payload["context"]["chatbot"], "support");
        assert!(payload["context"]["timestamp"].is_string());

        let signature = request.headers.get("X-Webhook-Signature").unwrap();
        let body = String::from_utf8(request.body.clone()).unwrap();
        assert_eq!(signature.to_str().unwrap(), sign_payload("topsecret", &body));
    }

    #[tokio::test]
    async fn empty_secret_sends_no_signature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .mount(&server)
            .await;

        let gateway = ToolGateway::new("example.com").unwrap();
        let config = config_with_webhook(&server.uri(), "");
        let result = gateway
            .execute(&config, "lookup_order", json!({}), Map::new())
            .await
            .unwrap();
        // Non-JSON body comes back verbatim.
        assert_eq!(result, json!("done"));

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("X-Webhook-Signature").is_none());
    }

    #[tokio::test]
    async fn custom_headers_are_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(wiremock::matchers::header("X-Api-Key", "k-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "fine"})))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = ToolGateway::new("example.com").unwrap();
        let mut config = config_with_webhook(&server.uri(), "");
        config
            .tools
            .headers
            .insert("X-Api-Key".to_string(), "k-123".to_string());
        let result = gateway
            .execute(&config, "lookup_order", json!({}), Map::new())
            .await
            .unwrap();
        assert_eq!(result, json!("fine"));
    }

    #[tokio::test]
    async fn non_2xx_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(500).set_body_string("workflow crashed"))
            .mount(&server)
            .await;

        let gateway = ToolGateway::new("example.com").unwrap();
        let config = config_with_webhook(&server.uri(), "");
        let err = gateway
            .execute(&config, "lookup_order", json!({}), Map::new())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("500"), "got: {message}");
        assert!(message.contains("workflow crashed"), "got: {message}");
    }

    #[tokio::test]
    async fn unextractable_json_returns_raw_structure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "queued", "id": 4})),
            )
            .mount(&server)
            .await;

        let gateway = ToolGateway::new("example.com").unwrap();
        let config = config_with_webhook(&server.uri(), "");
        let result = gateway
            .execute(&config, "lookup_order", json!({}), Map::new())
            .await
            .unwrap();
        assert_eq!(result, json!({"status": "queued", "id": 4}));
    }

    #[tokio::test]
    async fn test_connection_posts_pseudo_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "pong"})))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = ToolGateway::new("example.com").unwrap();
        gateway
            .test_connection(&format!("{}/hook", server.uri()), "s", &HashMap::new())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let payload: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(payload["action"], "_test_connection");
    }
}
