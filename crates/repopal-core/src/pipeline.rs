//! Pipeline Orchestrator (C7): the one place that drives an event through
//! C1 → C3 → C4 → C5 → C6 → C1, threading a single response conversation
//! across all three phases (`initial`, `update`, `final`).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::error::PipelineError;
use crate::git::Git;
use crate::providers::ProviderAdapter;
use crate::registry::CommandRegistry;
use crate::sandbox::{ContainerRuntime, SandboxExecutor};
use crate::types::{CorrelationId, EnvironmentConfig, Event, Provider, ResponsePhase};
use crate::{changes, vcs};

/// The single completion primitive and its derived operations, as seen from
/// the orchestrator's side. Defined here (rather than depending on
/// `repopal-llm` directly, which would invert the workspace's dependency
/// graph) and implemented by `repopal_llm::Planner`.
#[async_trait::async_trait]
pub trait Planner: Send + Sync {
    async fn select_command(&self, user_request: &str, candidates: &[(&str, &str)]) -> Result<String, PipelineError>;
    async fn generate_args(&self, user_request: &str, command_docs: &str) -> Result<HashMap<String, String>, PipelineError>;
    async fn summarize(
        &self,
        user_request: &str,
        command_name: &str,
        command_output: &str,
        changes: &crate::types::ChangeSet,
    ) -> Result<String, PipelineError>;
    async fn status_received(&self, user_request: &str) -> Result<String, PipelineError>;
    async fn status_selected(&self, command_name: &str, command_args: &str, user_request: &str) -> Result<String, PipelineError>;
    async fn status_completed(&self, changes_summary: &str, user_request: &str) -> Result<String, PipelineError>;
}

/// Everything one invocation needs: the repo to clone, the GitHub
/// credentials to publish with, and how long the invocation is allowed to
/// run for.
pub struct PipelineConfig {
    /// Used when an event carries no repository of its own (e.g. a chat
    /// slash command with no GitHub context attached). Events that do name a
    /// repository clone that one instead — see `drive`.
    pub default_repo_url: String,
    pub base_branch: String,
    pub github_token: Option<String>,
    pub invocation_timeout: Duration,
}

/// Holds `Arc`s to every collaborator the orchestrator drives: the command
/// registry, the LLM planner, the container runtime, and one adapter per
/// supported provider. Cheap to clone; intended to be built once at startup
/// and shared across every `tokio::spawn`ed invocation.
pub struct Pipeline {
    registry: Arc<CommandRegistry>,
    planner: Arc<dyn Planner>,
    runtime: Arc<dyn ContainerRuntime>,
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
    http_client: reqwest::Client,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        registry: Arc<CommandRegistry>,
        planner: Arc<dyn Planner>,
        runtime: Arc<dyn ContainerRuntime>,
        adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            planner,
            runtime,
            adapters,
            http_client: reqwest::Client::new(),
            config,
        }
    }

    /// Run one invocation to completion. Spawned via `tokio::spawn` per
    /// event by the caller; errors are already surfaced to the user via a
    /// best-effort final thread update before this returns, so callers only
    /// need the `Result` for their own logging.
    #[instrument(skip_all, fields(provider = ?event.provider, kind = ?event.kind))]
    pub async fn handle(&self, event: Event) -> Result<(), PipelineError> {
        let correlation_id = CorrelationId::new();
        tokio::time::timeout(self.config.invocation_timeout, self.run(&event, &correlation_id))
            .await
            .unwrap_or(Err(PipelineError::Cancelled))
    }

    async fn run(&self, event: &Event, correlation_id: &CorrelationId) -> Result<(), PipelineError> {
        let adapter = self
            .adapters
            .get(&event.provider)
            .ok_or(PipelineError::UnsupportedProvider)?
            .clone();

        let received = self.planner.status_received(&event.user_request).await.unwrap_or_else(|_| {
            "Got your request, working on it.".to_string()
        });
        let thread_id = adapter.respond(event, &received, ResponsePhase::Initial, None).await?;

        let outcome = self.drive(event, correlation_id, &*adapter, &thread_id).await;
        if let Err(err) = &outcome {
            let _ = adapter
                .respond(event, &err.user_message(), ResponsePhase::Final, Some(&thread_id))
                .await;
        }
        outcome
    }

    /// Steps 3-10 of the orchestration sequence. Split out from `run` so the
    /// `?` operator can be used freely while `run` still gets a chance to
    /// post a final update on any error this returns.
    async fn drive(
        &self,
        event: &Event,
        correlation_id: &CorrelationId,
        adapter: &dyn ProviderAdapter,
        thread_id: &str,
    ) -> Result<(), PipelineError> {
        let candidates = self.registry.filter_for(event.kind);
        if candidates.is_empty() {
            // Posting the explanatory final update is `run`'s job (it does
            // so for every `Err` this function returns before reaching the
            // command-execution branch below) — returning early here keeps
            // that a single call site instead of two.
            return Err(PipelineError::NoCommandAvailable);
        }
        let candidate_pairs: Vec<(&str, &str)> =
            candidates.iter().map(|c| (c.name.as_str(), c.description.as_str())).collect();

        let name = self.planner.select_command(&event.user_request, &candidate_pairs).await?;
        let descriptor = self.registry.lookup(&name).map_err(|_| PipelineError::planner(format!("unknown command '{name}' selected")))?;

        let raw_args = self.planner.generate_args(&event.user_request, &descriptor.documentation).await?;
        let args = descriptor
            .validate_args(&raw_args)
            .map_err(|e| PipelineError::planner(format!("argument validation failed: {e}")))?;

        let args_display = serde_json::to_string(&args).unwrap_or_default();
        let selected = self
            .planner
            .status_selected(&descriptor.name, &args_display, &event.user_request)
            .await
            .unwrap_or_else(|_| format!("Selected command: {}", descriptor.name));
        adapter.respond(event, &selected, ResponsePhase::Update, Some(thread_id)).await?;

        let repo_url = match &event.payload.repository {
            Some(full_name) => format!("https://github.com/{full_name}.git"),
            None => self.config.default_repo_url.clone(),
        };
        if repo_url.is_empty() {
            return Err(PipelineError::sandbox("no repository on the event and no default repo configured"));
        }

        let env_config = EnvironmentConfig {
            repo_url,
            branch: self.config.base_branch.clone(),
            env_vars: HashMap::new(),
            access_token: self.config.github_token.clone(),
        };

        let sandbox = SandboxExecutor::setup_repository(&*self.runtime, &env_config, correlation_id.as_str())
            .await
            .map_err(|e| PipelineError::sandbox(e.to_string()))?;

        let result = self.execute_and_publish(event, correlation_id, &descriptor.name, &args, &sandbox, &*descriptor).await;
        sandbox.teardown().await;

        let (summary_text, outcome) = result?;
        adapter.respond(event, &summary_text, ResponsePhase::Final, Some(thread_id)).await?;
        // The final update above already told the user the command failed
        // and why; a command-level failure is a completed invocation, not
        // an orchestrator-level one, so it doesn't also go through `run`'s
        // catch-all (which would post a second, redundant final update).
        if let Err(err) = &outcome {
            warn!(%err, "invocation completed with a command-level failure");
        }
        Ok(())
    }

    async fn execute_and_publish(
        &self,
        event: &Event,
        correlation_id: &CorrelationId,
        command_name: &str,
        args: &crate::types::ValidatedArgs,
        sandbox: &SandboxExecutor<'_>,
        descriptor: &crate::registry::CommandDescriptor,
    ) -> Result<(String, Result<(), PipelineError>), PipelineError> {
        sandbox
            .setup_container(&descriptor.recipe, &[])
            .await
            .map_err(|e| PipelineError::sandbox(e.to_string()))?;

        let shell_command = descriptor.execution_string(args);
        let outcome = sandbox
            .execute(&shell_command)
            .await
            .map_err(|e| PipelineError::sandbox(e.to_string()))?;

        let git = Git::new(sandbox.workspace.to_string_lossy().to_string());
        let change_set = changes::extract(&git, &git.repo_path).map_err(|e| PipelineError::sandbox(e.to_string()))?;

        if !outcome.success {
            warn!(exit_code = outcome.exit_code, "command exited non-zero");
        }

        // The commit message is produced by the LLM planner, so it has to be
        // in hand before `publish` ever calls `vcs::commit_and_push`.
        let summary = self
            .planner
            .summarize(&event.user_request, command_name, &outcome.combined_output, &change_set)
            .await
            .unwrap_or_else(|_| "Command finished; see the branch for details.".to_string());

        let pr_url = if outcome.success && !change_set.is_empty() {
            self.publish(event, correlation_id, &git, command_name, &summary).await?
        } else {
            None
        };

        let status = self
            .planner
            .status_completed(&summary, &event.user_request)
            .await
            .unwrap_or_else(|_| summary.clone());

        let full_message = match &pr_url {
            Some(url) => format!("{status}\n\nPull request: {url}"),
            None if !outcome.success => format!("{status}\n\n(command exited non-zero; no pull request opened)"),
            None => format!("{status}\n\n(no changes were made; no pull request opened)"),
        };

        let command_result = if outcome.success {
            Ok(())
        } else {
            Err(PipelineError::CommandFailure {
                exit_code: outcome.exit_code,
                stderr_excerpt: outcome.stderr_excerpt(2000),
            })
        };

        Ok((full_message, command_result))
    }

    async fn publish(
        &self,
        event: &Event,
        correlation_id: &CorrelationId,
        git: &Git,
        command_name: &str,
        commit_message: &str,
    ) -> Result<Option<String>, PipelineError> {
        let token = self
            .config
            .github_token
            .as_deref()
            .ok_or_else(|| PipelineError::publish("no github token configured"))?;

        let committed = vcs::commit_and_push(git, &git.repo_path, correlation_id, commit_message).await?;
        if !committed {
            return Ok(None);
        }

        let repo_full_name = event
            .payload
            .repository
            .clone()
            .ok_or_else(|| PipelineError::publish("event payload missing repository"))?;

        let url = vcs::open_pull_request(
            &self.http_client,
            token,
            &repo_full_name,
            correlation_id,
            &self.config.base_branch,
            &format!("repopal: {command_name}"),
            &event.user_request,
        )
        .await?;
        info!(%url, "opened pull request");
        Ok(Some(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeSet, EventKind, StandardPayload};

    struct StubPlanner;

    #[async_trait::async_trait]
    impl Planner for StubPlanner {
        async fn select_command(&self, _user_request: &str, candidates: &[(&str, &str)]) -> Result<String, PipelineError> {
            Ok(candidates.first().map(|(name, _)| name.to_string()).unwrap_or_default())
        }
        async fn generate_args(&self, _user_request: &str, _command_docs: &str) -> Result<HashMap<String, String>, PipelineError> {
            Ok(HashMap::new())
        }
        async fn summarize(&self, _u: &str, _c: &str, _o: &str, _ch: &ChangeSet) -> Result<String, PipelineError> {
            Ok("did a thing".into())
        }
        async fn status_received(&self, _user_request: &str) -> Result<String, PipelineError> {
            Ok("received".into())
        }
        async fn status_selected(&self, _c: &str, _a: &str, _u: &str) -> Result<String, PipelineError> {
            Ok("selected".into())
        }
        async fn status_completed(&self, _s: &str, _u: &str) -> Result<String, PipelineError> {
            Ok("completed".into())
        }
    }

    fn sample_event(kind: EventKind) -> Event {
        Event {
            provider: Provider::Github,
            kind,
            action: None,
            user_request: "say hello".into(),
            payload: StandardPayload { repository: Some("acme/widgets".into()), ..Default::default() },
            raw_payload: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn run_fails_fast_when_provider_has_no_registered_adapter() {
        let pipeline = Pipeline::new(
            Arc::new(CommandRegistry::with_builtins()),
            Arc::new(StubPlanner),
            Arc::new(crate::sandbox::DockerCliRuntime::new()),
            HashMap::new(),
            PipelineConfig {
                default_repo_url: "https://github.com/acme/widgets.git".into(),
                base_branch: "main".into(),
                github_token: None,
                invocation_timeout: Duration::from_secs(5),
            },
        );
        let event = sample_event(EventKind::Issue);
        let err = pipeline.handle(event).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedProvider));
    }
}
