use async_trait::async_trait;
use serde_json::Value;

use crate::error::PipelineError;
use crate::types::{Event, EventKind, Provider, ResponsePhase, StandardPayload};

use super::{verify_hmac_sha256, HeaderMap, ProviderAdapter};

/// Replay window for Slack's signed-request scheme: requests whose
/// `X-Slack-Request-Timestamp` is further than this from "now" are rejected
/// even if the signature itself checks out.
const MAX_TIMESTAMP_SKEW_SECONDS: i64 = 300;

/// Slash commands and `message` events from the Events API. Outbound
/// messages go through `chat.postMessage`, threaded via `thread_ts`.
pub struct SlackAdapter {
    signing_secret: String,
    bot_token: String,
    client: reqwest::Client,
}

impl SlackAdapter {
    pub fn new(signing_secret: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            bot_token: bot_token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn channel_id(payload: &Value) -> Option<&str> {
        payload
            .get("channel_id")
            .and_then(|v| v.as_str())
            .or_else(|| payload.get("event")?.get("channel")?.as_str())
    }
}

#[async_trait]
impl ProviderAdapter for SlackAdapter {
    fn provider(&self) -> Provider {
        Provider::Slack
    }

    fn validate(&self, headers: &HeaderMap, raw_body: &[u8]) -> bool {
        // Slack's URL-verification handshake carries no signature worth
        // checking against — it's how Slack confirms a freshly configured
        // endpoint before any real traffic (and therefore any signing
        // secret agreement) exists.
        if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(raw_body) {
            if map.get("type").and_then(|v| v.as_str()) == Some("url_verification") {
                return true;
            }
        }

        let Some(signature) = headers.get("X-Slack-Signature") else {
            return false;
        };
        let Some(timestamp) = headers.get("X-Slack-Request-Timestamp") else {
            return false;
        };
        let Ok(timestamp_val) = timestamp.parse::<i64>() else {
            return false;
        };
        let now = chrono::Utc::now().timestamp();
        if (now - timestamp_val).abs() > MAX_TIMESTAMP_SKEW_SECONDS {
            return false;
        }

        let mut base = format!("v0:{timestamp}:").into_bytes();
        base.extend_from_slice(raw_body);
        verify_hmac_sha256(&self.signing_secret, &base, signature, "v0=")
    }

    fn normalize(&self, payload: Value) -> Event {
        let (kind, user_request) = if payload.get("command").is_some() {
            let command = payload.get("command").and_then(|v| v.as_str()).unwrap_or("");
            let text = payload.get("text").and_then(|v| v.as_str()).unwrap_or("");
            (EventKind::SlashCommand, format!("{command} {text}").trim().to_string())
        } else {
            let text = payload
                .get("event")
                .and_then(|e| e.get("text"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            (EventKind::Message, text.to_string())
        };

        let user = payload
            .get("user_id")
            .and_then(|v| v.as_str())
            .or_else(|| payload.get("event")?.get("user")?.as_str())
            .map(str::to_string);

        let std_payload = StandardPayload {
            title: None,
            description: Some(user_request.clone()),
            user,
            repository: None,
            url: None,
        };

        Event {
            provider: Provider::Slack,
            kind,
            action: None,
            user_request,
            payload: std_payload,
            raw_payload: payload,
        }
    }

    async fn respond(
        &self,
        event: &Event,
        message: &str,
        _phase: ResponsePhase,
        thread_id: Option<&str>,
    ) -> Result<String, PipelineError> {
        let channel = Self::channel_id(&event.raw_payload)
            .ok_or_else(|| PipelineError::publish("missing channel id in payload"))?;

        let mut body = serde_json::json!({ "channel": channel, "text": message });
        if let Some(ts) = thread_id {
            body["thread_ts"] = Value::String(ts.to_string());
        }

        let resp = self
            .client
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::publish(e.to_string()))?;
        let resp_body: Value = resp.json().await.map_err(|e| PipelineError::publish(e.to_string()))?;

        if !resp_body.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            let err = resp_body.get("error").and_then(|v| v.as_str()).unwrap_or("unknown error");
            return Err(PipelineError::publish(format!("slack chat.postMessage failed: {err}")));
        }
        let ts = resp_body
            .get("ts")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PipelineError::publish("slack response missing ts"))?;
        Ok(ts.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, body: &str) -> String {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;
        let base = format!("v0:{timestamp}:{body}");
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(base.as_bytes());
        format!("v0={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn validate_accepts_fresh_signed_request() {
        let adapter = SlackAdapter::new("secret", "token");
        let now = chrono::Utc::now().timestamp().to_string();
        let body = r#"{"command":"/repopal"}"#;
        let sig = sign("secret", &now, body);

        let mut headers = HeaderMap::new();
        headers.insert("X-Slack-Signature", sig);
        headers.insert("X-Slack-Request-Timestamp", now);
        assert!(adapter.validate(&headers, body.as_bytes()));
    }

    #[test]
    fn validate_rejects_stale_timestamp_even_with_correct_signature() {
        let adapter = SlackAdapter::new("secret", "token");
        let stale = (chrono::Utc::now().timestamp() - 1000).to_string();
        let body = r#"{"command":"/repopal"}"#;
        let sig = sign("secret", &stale, body);

        let mut headers = HeaderMap::new();
        headers.insert("X-Slack-Signature", sig);
        headers.insert("X-Slack-Request-Timestamp", stale);
        assert!(!adapter.validate(&headers, body.as_bytes()));
    }

    #[test]
    fn validate_rejects_when_signature_was_computed_over_reserialized_body() {
        let adapter = SlackAdapter::new("secret", "token");
        let now = chrono::Utc::now().timestamp().to_string();
        let received_body = r#"{"command": "/repopal"}"#;
        let reserialized_body = r#"{"command":"/repopal"}"#;
        let sig = sign("secret", &now, reserialized_body);

        let mut headers = HeaderMap::new();
        headers.insert("X-Slack-Signature", sig);
        headers.insert("X-Slack-Request-Timestamp", now);
        assert!(!adapter.validate(&headers, received_body.as_bytes()));
    }

    #[test]
    fn validate_accepts_url_verification_handshake_without_a_signature() {
        let adapter = SlackAdapter::new("secret", "token");
        let body = r#"{"type":"url_verification","challenge":"abc123","token":"xyz"}"#;
        let headers = HeaderMap::new();
        assert!(adapter.validate(&headers, body.as_bytes()));
    }

    #[test]
    fn normalize_slash_command_joins_command_and_text() {
        let adapter = SlackAdapter::new("secret", "token");
        let payload = serde_json::json!({
            "command": "/repopal",
            "text": "fix the typo in README",
            "user_id": "U123",
            "channel_id": "C456"
        });
        let event = adapter.normalize(payload);
        assert_eq!(event.kind, EventKind::SlashCommand);
        assert_eq!(event.user_request, "/repopal fix the typo in README");
        assert_eq!(event.payload.user.as_deref(), Some("U123"));
    }

    #[test]
    fn normalize_message_event_extracts_text_and_channel() {
        let adapter = SlackAdapter::new("secret", "token");
        let payload = serde_json::json!({
            "event": { "type": "message", "text": "hello bot", "user": "U789", "channel": "C001" }
        });
        let event = adapter.normalize(payload);
        assert_eq!(event.kind, EventKind::Message);
        assert_eq!(event.user_request, "hello bot");
    }
}
