use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use repopal_core::error::PipelineError;
use repopal_core::pipeline::Planner;
use repopal_core::types::ChangeSet;
use serde_json::Value;

use crate::extract::{extract_answer, parse_argument_mapping};
use crate::prompts::{self, StatusStage};

/// The single completion primitive every concrete planner is built around:
/// one async call with system+user roles, returning the model's raw text.
/// Kept separate from [`repopal_core::pipeline::Planner`] — the orchestrator
/// only ever sees the derived operations below, not this primitive.
#[async_trait]
trait Completion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, PipelineError>;
}

async fn select_command(completion: &dyn Completion, user_request: &str, candidates: &[(&str, &str)]) -> Result<String, PipelineError> {
    let prompt = prompts::select_command(user_request, candidates);
    let response = completion.complete(prompts::SELECT_COMMAND_SYSTEM, &prompt).await?;
    Ok(extract_answer(&response))
}

async fn generate_args(completion: &dyn Completion, user_request: &str, command_docs: &str) -> Result<HashMap<String, String>, PipelineError> {
    let prompt = prompts::generate_args(user_request, command_docs);
    let response = completion.complete(prompts::GENERATE_ARGS_SYSTEM, &prompt).await?;
    Ok(parse_argument_mapping(&extract_answer(&response)))
}

async fn summarize(
    completion: &dyn Completion,
    user_request: &str,
    command_name: &str,
    command_output: &str,
    changes: &ChangeSet,
) -> Result<String, PipelineError> {
    let prompt = prompts::summarize(user_request, command_name, command_output, changes);
    let response = completion.complete(prompts::SUMMARIZE_SYSTEM, &prompt).await?;
    Ok(extract_answer(&response))
}

async fn status_message(completion: &dyn Completion, stage: StatusStage<'_>) -> Result<String, PipelineError> {
    let prompt = prompts::status_message(&stage);
    let response = completion.complete(prompts::STATUS_SYSTEM, &prompt).await?;
    Ok(extract_answer(&response))
}

/// Calls an OpenAI-compatible `/chat/completions` endpoint. One HTTP call,
/// JSON in, JSON out — the same shape this codebase's own outbound network
/// calls take, rather than shelling out to a CLI agent tool.
pub struct HttpPlanner {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl HttpPlanner {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Completion for HttpPlanner {
    async fn complete(&self, system: &str, user: &str) -> Result<String, PipelineError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = self.client.post(&url).bearer_auth(&self.api_key).json(&serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        }));

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| PipelineError::planner("completion request timed out"))?
            .map_err(|e| PipelineError::planner(e.to_string()))?;

        let body: Value = response.json().await.map_err(|e| PipelineError::planner(e.to_string()))?;
        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| PipelineError::planner("completion response missing choices[0].message.content"))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl Planner for HttpPlanner {
    async fn select_command(&self, user_request: &str, candidates: &[(&str, &str)]) -> Result<String, PipelineError> {
        select_command(self, user_request, candidates).await
    }
    async fn generate_args(&self, user_request: &str, command_docs: &str) -> Result<HashMap<String, String>, PipelineError> {
        generate_args(self, user_request, command_docs).await
    }
    async fn summarize(&self, user_request: &str, command_name: &str, command_output: &str, changes: &ChangeSet) -> Result<String, PipelineError> {
        summarize(self, user_request, command_name, command_output, changes).await
    }
    async fn status_received(&self, user_request: &str) -> Result<String, PipelineError> {
        status_message(self, StatusStage::Received { user_request }).await
    }
    async fn status_selected(&self, command_name: &str, command_args: &str, user_request: &str) -> Result<String, PipelineError> {
        status_message(self, StatusStage::Selected { command_name, command_args, user_request }).await
    }
    async fn status_completed(&self, changes_summary: &str, user_request: &str) -> Result<String, PipelineError> {
        status_message(self, StatusStage::Completed { changes_summary, user_request }).await
    }
}

/// Returns canned completions keyed by a substring of the user prompt, so
/// end-to-end pipeline tests never need a live model or a mocked HTTP layer.
#[derive(Default)]
pub struct FakePlanner {
    responses: Vec<(String, String)>,
}

impl FakePlanner {
    pub fn new() -> Self {
        Self { responses: Vec::new() }
    }

    pub fn on_prompt_containing(mut self, substring: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses.push((substring.into(), response.into()));
        self
    }
}

#[async_trait]
impl Completion for FakePlanner {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, PipelineError> {
        self.responses
            .iter()
            .find(|(substring, _)| user.contains(substring.as_str()))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| PipelineError::planner(format!("FakePlanner has no canned response for prompt: {user}")))
    }
}

#[async_trait]
impl Planner for FakePlanner {
    async fn select_command(&self, user_request: &str, candidates: &[(&str, &str)]) -> Result<String, PipelineError> {
        select_command(self, user_request, candidates).await
    }
    async fn generate_args(&self, user_request: &str, command_docs: &str) -> Result<HashMap<String, String>, PipelineError> {
        generate_args(self, user_request, command_docs).await
    }
    async fn summarize(&self, user_request: &str, command_name: &str, command_output: &str, changes: &ChangeSet) -> Result<String, PipelineError> {
        summarize(self, user_request, command_name, command_output, changes).await
    }
    async fn status_received(&self, user_request: &str) -> Result<String, PipelineError> {
        status_message(self, StatusStage::Received { user_request }).await
    }
    async fn status_selected(&self, command_name: &str, command_args: &str, user_request: &str) -> Result<String, PipelineError> {
        status_message(self, StatusStage::Selected { command_name, command_args, user_request }).await
    }
    async fn status_completed(&self, changes_summary: &str, user_request: &str) -> Result<String, PipelineError> {
        status_message(self, StatusStage::Completed { changes_summary, user_request }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn select_command_extracts_bare_name_from_reasoning() {
        let planner = FakePlanner::new().on_prompt_containing(
            "fix the typo",
            "<reasoning>find_replace fits best</reasoning><answer>find_replace</answer>",
        );
        let chosen = planner
            .select_command("fix the typo in README", &[("find_replace", "replace text"), ("hello_world", "smoke test")])
            .await
            .unwrap();
        assert_eq!(chosen, "find_replace");
    }

    #[tokio::test]
    async fn generate_args_parses_json_object_from_answer_tag() {
        let planner = FakePlanner::new().on_prompt_containing(
            "fix the typo",
            r#"<answer>{"find_pattern": "teh", "replace_text": "the"}</answer>"#,
        );
        let args = planner.generate_args("fix the typo", "docs").await.unwrap();
        assert_eq!(args.get("find_pattern"), Some(&"teh".to_string()));
    }

    #[tokio::test]
    async fn select_command_without_a_matching_canned_response_is_a_planner_failure() {
        let planner = FakePlanner::new();
        let err = planner.select_command("unmatched prompt", &[("hello_world", "smoke test")]).await.unwrap_err();
        assert!(matches!(err, PipelineError::PlannerFailure { .. }));
    }
}
