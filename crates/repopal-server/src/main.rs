mod logging;
mod routes;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use repopal_core::config::Config;
use repopal_core::pipeline::{Pipeline, PipelineConfig};
use repopal_core::providers::{github::GitHubAdapter, slack::SlackAdapter, ProviderAdapter};
use repopal_core::registry::CommandRegistry;
use repopal_core::sandbox::DockerCliRuntime;
use repopal_core::types::Provider;
use repopal_llm::HttpPlanner;
use tracing::info;

/// Everything a spawned webhook handler needs: the adapter to validate and
/// respond with, and the pipeline to hand the normalized event to. One
/// instance, built once at startup, shared behind an `Arc` across every
/// request.
pub struct AppState {
    pub adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
    pub pipeline: Arc<Pipeline>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env()?;

    let mut adapters: HashMap<Provider, Arc<dyn ProviderAdapter>> = HashMap::new();
    adapters.insert(
        Provider::Github,
        Arc::new(GitHubAdapter::new(config.github_webhook_secret.clone(), config.github_token.clone())),
    );
    adapters.insert(
        Provider::Slack,
        Arc::new(SlackAdapter::new(config.slack_signing_secret.clone(), config.slack_bot_token.clone())),
    );

    let registry = Arc::new(CommandRegistry::with_builtins());
    let planner = Arc::new(HttpPlanner::new(
        config.llm_base_url.clone(),
        config.llm_model.clone(),
        config.llm_api_key.clone(),
        Duration::from_secs(60),
    ));
    let runtime = Arc::new(DockerCliRuntime::new());

    let pipeline_config = PipelineConfig {
        default_repo_url: config.default_repo_url.clone(),
        base_branch: config.default_base_branch.clone(),
        github_token: (!config.github_token.is_empty()).then(|| config.github_token.clone()),
        invocation_timeout: Duration::from_secs(config.invocation_timeout_s),
    };

    let pipeline = Arc::new(Pipeline::new(registry, planner, runtime, adapters.clone(), pipeline_config));

    let state = Arc::new(AppState { adapters, pipeline });

    let app = Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/api/webhooks/:provider", post(routes::webhook))
        .with_state(state);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    info!(%addr, "repopal-server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
