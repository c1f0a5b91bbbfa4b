use async_trait::async_trait;
use serde_json::Value;

use crate::error::PipelineError;
use crate::types::{Event, EventKind, Provider, ResponsePhase, StandardPayload};

use super::{verify_hmac_sha256, HeaderMap, ProviderAdapter};

/// Issues, PR review comments, PR/issue comments, and pushes from
/// `https://api.github.com`. Outbound calls use the plain REST endpoints
/// directly over `reqwest` rather than a generated client crate, the same
/// shape the reference codebase's own chat-provider client uses.
pub struct GitHubAdapter {
    webhook_secret: String,
    token: String,
    client: reqwest::Client,
}

impl GitHubAdapter {
    pub fn new(webhook_secret: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn repo_full_name(payload: &Value) -> Option<&str> {
        payload.get("repository")?.get("full_name")?.as_str()
    }

    fn issue_or_pr_number(payload: &Value) -> Option<u64> {
        payload
            .get("issue")
            .or_else(|| payload.get("pull_request"))
            .and_then(|o| o.get("number"))
            .and_then(|n| n.as_u64())
    }
}

#[async_trait]
impl ProviderAdapter for GitHubAdapter {
    fn provider(&self) -> Provider {
        Provider::Github
    }

    fn validate(&self, headers: &HeaderMap, raw_body: &[u8]) -> bool {
        let Some(signature) = headers.get("X-Hub-Signature-256") else {
            return false;
        };
        verify_hmac_sha256(&self.webhook_secret, raw_body, signature, "sha256=")
    }

    fn normalize(&self, payload: Value) -> Event {
        let action = payload.get("action").and_then(|a| a.as_str()).map(str::to_string);

        let (kind, user_request) = if let Some(pr) = payload.get("pull_request") {
            let title = pr.get("title").and_then(|v| v.as_str()).unwrap_or("Untitled PR");
            let body = pr.get("body").and_then(|v| v.as_str()).unwrap_or("No description provided");
            let author = pr
                .get("user")
                .and_then(|u| u.get("login"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            (
                EventKind::PullRequest,
                format!("Review pull request: {title}\nDescription: {body}\nAuthor: {author}"),
            )
        } else if payload.get("comment").is_some() {
            let comment = &payload["comment"];
            let context = if payload.get("issue").is_some() { "issue" } else { "pull request" };
            let parent = payload.get("issue").or_else(|| payload.get("pull_request"));
            let title = parent
                .and_then(|p| p.get("title"))
                .and_then(|v| v.as_str())
                .unwrap_or("Untitled");
            let body = comment.get("body").and_then(|v| v.as_str()).unwrap_or("No comment body");
            let author = comment
                .get("user")
                .and_then(|u| u.get("login"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            (
                EventKind::Comment,
                format!("Review {context} comment on: {title}\nComment: {body}\nAuthor: {author}"),
            )
        } else if payload.get("issue").is_some() {
            let issue = &payload["issue"];
            let title = issue.get("title").and_then(|v| v.as_str()).unwrap_or("Untitled Issue");
            let body = issue.get("body").and_then(|v| v.as_str()).unwrap_or("No description provided");
            let author = issue
                .get("user")
                .and_then(|u| u.get("login"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            (
                EventKind::Issue,
                format!("Check issue: {title}\nDescription: {body}\nAuthor: {author}"),
            )
        } else {
            let sender = payload
                .get("sender")
                .and_then(|s| s.get("login"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            (EventKind::Push, format!("Handle push event from {sender}"))
        };

        let std_payload = StandardPayload {
            title: payload.get("pull_request").or_else(|| payload.get("issue"))
                .and_then(|o| o.get("title")).and_then(|v| v.as_str()).map(str::to_string),
            description: payload.get("pull_request").or_else(|| payload.get("issue"))
                .and_then(|o| o.get("body")).and_then(|v| v.as_str()).map(str::to_string),
            user: payload.get("sender").and_then(|s| s.get("login")).and_then(|v| v.as_str()).map(str::to_string),
            repository: Self::repo_full_name(&payload).map(str::to_string),
            url: payload.get("repository").and_then(|r| r.get("html_url")).and_then(|v| v.as_str()).map(str::to_string),
        };

        Event {
            provider: Provider::Github,
            kind,
            action,
            user_request,
            payload: std_payload,
            raw_payload: payload,
        }
    }

    async fn respond(
        &self,
        event: &Event,
        message: &str,
        phase: ResponsePhase,
        thread_id: Option<&str>,
    ) -> Result<String, PipelineError> {
        if event.kind == EventKind::Push {
            return Err(PipelineError::UnsupportedEventKind);
        }
        let repo = Self::repo_full_name(&event.raw_payload)
            .ok_or_else(|| PipelineError::publish("missing repository.full_name in payload"))?;
        let number = Self::issue_or_pr_number(&event.raw_payload)
            .ok_or_else(|| PipelineError::publish("missing issue/pull_request number in payload"))?;

        match (phase, thread_id) {
            (ResponsePhase::Initial, _) | (_, None) => {
                let url = format!("https://api.github.com/repos/{repo}/issues/{number}/comments");
                let resp = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.token)
                    .header("User-Agent", "repopal")
                    .json(&serde_json::json!({ "body": message }))
                    .send()
                    .await
                    .map_err(|e| PipelineError::publish(e.to_string()))?;
                let body: Value = resp.json().await.map_err(|e| PipelineError::publish(e.to_string()))?;
                let id = body.get("id").and_then(|v| v.as_u64())
                    .ok_or_else(|| PipelineError::publish("github comment response missing id"))?;
                Ok(id.to_string())
            }
            (_, Some(id)) => {
                let url = format!("https://api.github.com/repos/{repo}/issues/comments/{id}");
                self.client
                    .patch(&url)
                    .bearer_auth(&self.token)
                    .header("User-Agent", "repopal")
                    .json(&serde_json::json!({ "body": message }))
                    .send()
                    .await
                    .map_err(|e| PipelineError::publish(e.to_string()))?;
                Ok(id.to_string())
            }
        }
    }
}
