// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the AIPass gateway.
//!
//! Every authenticated call follows the same retry policy: on a 401,
//! refresh the token once and retry the original request exactly once.
//! A second 401 or a failed refresh surfaces the error.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use sitebot_core::SitebotError;
use tracing::{debug, warn};

use crate::token::TokenManager;
use crate::types::{
    classify_provider_error, CompletionRequest, CompletionResponse, CompletionResult, Envelope,
    TranscriptionResponse, UsageSummary,
};

/// Per-request timeout for audio endpoints, which move larger payloads.
const AUDIO_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for the AIPass completion, usage, and audio endpoints.
pub struct AipassClient {
    http: reqwest::Client,
    base_url: String,
    completion_timeout: Duration,
    tokens: Arc<TokenManager>,
}

impl AipassClient {
    pub fn new(
        base_url: impl Into<String>,
        completion_timeout: Duration,
        tokens: Arc<TokenManager>,
    ) -> Result<Self, SitebotError> {
        let http = reqwest::Client::builder()
            .timeout(completion_timeout)
            .build()
            .map_err(|e| SitebotError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            completion_timeout,
            tokens,
        })
    }

    /// Sends an authenticated request, retrying once after a token refresh
    /// when the gateway answers 401.
    async fn send_authed<F>(&self, build: F) -> Result<reqwest::Response, SitebotError>
    where
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        for attempt in 0..=1u32 {
            let token = self.tokens.bearer_token().await?;
            let response = build(&self.http, &self.base_url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        SitebotError::Timeout {
                            duration: self.completion_timeout,
                        }
                    } else {
                        SitebotError::Provider {
                            message: format!("gateway request failed: {e}"),
                            source: Some(Box::new(e)),
                        }
                    }
                })?;

            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!("gateway returned 401, refreshing token and retrying once");
                self.tokens.refresh().await?;
                continue;
            }
            return Ok(response);
        }
        unreachable!("authed request loop always returns within two attempts")
    }

    /// Requests a chat completion.
    pub async fn generate_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResult, SitebotError> {
        let response = self
            .send_authed(|http, base| {
                http.post(format!("{base}/oauth2/v1/chat/completions"))
                    .json(request)
            })
            .await?;

        let status = response.status();
        debug!(status = %status, model = %request.model, "completion response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_provider_error(status.as_u16(), &body));
        }

        let body: CompletionResponse =
            response.json().await.map_err(|e| SitebotError::Provider {
                message: format!("malformed completion response: {e}"),
                source: Some(Box::new(e)),
            })?;
        CompletionResult::from_response(body)
    }

    /// Lists models available to this account.
    pub async fn list_models(&self) -> Result<Vec<String>, SitebotError> {
        let response = self
            .send_authed(|http, base| http.get(format!("{base}/api/v1/usage/models")))
            .await?;
        let envelope: Envelope<Vec<String>> = self.unwrap_envelope(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Fetches the account's usage and balance summary.
    pub async fn get_usage_summary(&self) -> Result<UsageSummary, SitebotError> {
        let response = self
            .send_authed(|http, base| http.get(format!("{base}/api/v1/usage/me/summary")))
            .await?;
        let envelope: Envelope<UsageSummary> = self.unwrap_envelope(response).await?;
        envelope.data.ok_or_else(|| SitebotError::Provider {
            message: "usage summary response carried no data".to_string(),
            source: None,
        })
    }

    /// Synthesizes speech audio for the given text. Returns raw audio bytes.
    pub async fn synthesize_speech(
        &self,
        text: &str,
        voice: &str,
        model: &str,
    ) -> Result<Vec<u8>, SitebotError> {
        let payload = serde_json::json!({
            "model": model,
            "input": text,
            "voice": voice,
        });
        let response = self
            .send_authed(|http, base| {
                http.post(format!("{base}/oauth2/v1/audio/speech"))
                    .timeout(AUDIO_TIMEOUT)
                    .json(&payload)
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_provider_error(status.as_u16(), &body));
        }
        let bytes = response.bytes().await.map_err(|e| SitebotError::Provider {
            message: format!("failed to read audio body: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(bytes.to_vec())
    }

    /// Transcribes an audio file to text via the multipart endpoint.
    pub async fn transcribe_audio(
        &self,
        audio: Vec<u8>,
        filename: &str,
        model: &str,
    ) -> Result<String, SitebotError> {
        let filename = filename.to_string();
        let model = model.to_string();
        let response = self
            .send_authed(move |http, base| {
                let part = reqwest::multipart::Part::bytes(audio.clone())
                    .file_name(filename.clone());
                let form = reqwest::multipart::Form::new()
                    .part("file", part)
                    .text("model", model.clone());
                http.post(format!("{base}/oauth2/v1/audio/transcriptions"))
                    .timeout(AUDIO_TIMEOUT)
                    .multipart(form)
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_provider_error(status.as_u16(), &body));
        }
        let body: TranscriptionResponse =
            response.json().await.map_err(|e| SitebotError::Provider {
                message: format!("malformed transcription response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(body.text)
    }

    async fn unwrap_envelope<T: serde::de::DeserializeOwned + Default>(
        &self,
        response: reqwest::Response,
    ) -> Result<Envelope<T>, SitebotError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_provider_error(status.as_u16(), &body));
        }
        let envelope: Envelope<T> =
            response.json().await.map_err(|e| SitebotError::Provider {
                message: format!("malformed envelope response: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !envelope.success {
            return Err(SitebotError::Provider {
                message: envelope
                    .message
                    .unwrap_or_else(|| "gateway reported failure without a message".to_string()),
                source: None,
            });
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use sitebot_storage::MemoryKv;
    use sitebot_test_utils::MemorySettings;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::types::ChatMessage;

    async fn client_with_token(base_url: &str, access_token: &str) -> AipassClient {
        let tokens = Arc::new(
            TokenManager::new(
                base_url,
                "client-123",
                Arc::new(MemorySettings::default()),
                Arc::new(MemoryKv::new()),
            )
            .unwrap(),
        );
        tokens
            .store_tokens(access_token, "refresh-token", chrono::Utc::now().timestamp() + 3600)
            .await
            .unwrap();
        AipassClient::new(base_url, Duration::from_secs(30), tokens).unwrap()
    }

    fn chat_request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::text("user", "Hello")],
            stream: false,
            temperature: Some(0.7),
            max_tokens: Some(256),
            tools: None,
        }
    }

    #[tokio::test]
    async fn completion_success_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/v1/chat/completions"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Hi!"}}],
                "usage": {"prompt_tokens": 8, "completion_tokens": 2, "total_tokens": 10},
                "model": "gpt-4o-mini",
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "tok-1").await;
        let result = client.generate_completion(&chat_request()).await.unwrap();
        assert_eq!(result.content, "Hi!");
        assert_eq!(result.usage.unwrap().total_tokens, 10);
    }

    #[tokio::test]
    async fn unauthorized_triggers_exactly_one_refresh_and_retry() {
        let server = MockServer::start().await;

        // Stale token rejected once.
        Mock::given(method("POST"))
            .and(path("/oauth2/v1/chat/completions"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/oauth2/v1/chat/completions"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "recovered"}}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "stale").await;
        let result = client.generate_completion(&chat_request()).await.unwrap();
        assert_eq!(result.content, "recovered");
    }

    #[tokio::test]
    async fn second_unauthorized_surfaces_without_looping() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("still expired"))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh-but-rejected",
                "expires_in": 3600,
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "stale").await;
        let err = client.generate_completion(&chat_request()).await.unwrap_err();
        assert!(matches!(err, SitebotError::Provider { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn budget_error_classified_from_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit", "message": "insufficient balance"},
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "tok").await;
        let err = client.generate_completion(&chat_request()).await.unwrap_err();
        assert!(matches!(err, SitebotError::BudgetExceeded { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn list_models_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/usage/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": ["gpt-4o-mini", "gpt-4o"],
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "tok").await;
        let models = client.list_models().await.unwrap();
        assert_eq!(models, vec!["gpt-4o-mini", "gpt-4o"]);
    }

    #[tokio::test]
    async fn envelope_failure_message_propagates_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/usage/me/summary"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "message": "account suspended",
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "tok").await;
        let err = client.get_usage_summary().await.unwrap_err();
        assert!(err.to_string().contains("account suspended"), "got: {err}");
    }

    #[tokio::test]
    async fn speech_synthesis_returns_raw_audio_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/v1/audio/speech"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(serde_json::json!({
                "model": "tts-1",
                "input": "Hello there",
                "voice": "alloy",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x49, 0x44, 0x33, 0x04]))
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "tok").await;
        let audio = client
            .synthesize_speech("Hello there", "alloy", "tts-1")
            .await
            .unwrap();
        assert_eq!(audio, vec![0x49, 0x44, 0x33, 0x04]);
    }

    #[tokio::test]
    async fn transcription_posts_multipart_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer tok"))
            .and(body_string_contains("filename=\"voice-note.ogg\""))
            .and(body_string_contains("whisper-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "hello from a voice note",
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "tok").await;
        let text = client
            .transcribe_audio(b"OggS fake audio".to_vec(), "voice-note.ogg", "whisper-1")
            .await
            .unwrap();
        assert_eq!(text, "hello from a voice note");
    }

    #[tokio::test]
    async fn transcription_rebuilds_multipart_body_on_retry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&server)
            .await;

        // The retried request must carry the full multipart body again.
        Mock::given(method("POST"))
            .and(path("/oauth2/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer fresh"))
            .and(body_string_contains("filename=\"voice-note.ogg\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "recovered transcript",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server.uri(), "stale").await;
        let text = client
            .transcribe_audio(b"OggS fake audio".to_vec(), "voice-note.ogg", "whisper-1")
            .await
            .unwrap();
        assert_eq!(text, "recovered transcript");
    }
}
