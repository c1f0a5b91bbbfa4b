use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which upstream service an event or response thread belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Slack,
    Linear,
}

impl Provider {
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "github" => Some(Provider::Github),
            "slack" => Some(Provider::Slack),
            "linear" => Some(Provider::Linear),
            _ => None,
        }
    }

    pub fn is_code_host(self) -> bool {
        matches!(self, Provider::Github)
    }

    pub fn is_chat(self) -> bool {
        matches!(self, Provider::Slack)
    }
}

/// The normalized shape of a webhook payload, independent of provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    PullRequest,
    Issue,
    Comment,
    Push,
    SlashCommand,
    Message,
}

/// The provider-agnostic fields every command and LLM prompt is built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub user: Option<String>,
    pub repository: Option<String>,
    pub url: Option<String>,
}

/// A normalized webhook event, produced once by a provider adapter's
/// `normalize` and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub provider: Provider,
    pub kind: EventKind,
    pub action: Option<String>,
    pub user_request: String,
    pub payload: StandardPayload,
    /// Preserved byte-for-byte equal to the request body that was
    /// signature-verified (P3).
    pub raw_payload: serde_json::Value,
}

/// One typed field in a command's argument schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgField {
    pub name: String,
    pub required: bool,
    pub default: Option<String>,
}

impl ArgField {
    pub fn required(name: &str) -> Self {
        Self { name: name.into(), required: true, default: None }
    }

    pub fn optional(name: &str, default: &str) -> Self {
        Self { name: name.into(), required: false, default: Some(default.into()) }
    }
}

/// Declarative build instructions for a command's container image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRecipe {
    pub dockerfile: String,
}

/// A validated, schema-coerced argument mapping ready to hand to a command's
/// `execution_string`.
pub type ValidatedArgs = HashMap<String, String>;

/// Repository clone target for one invocation. Used once, never retained.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub repo_url: String,
    pub branch: String,
    pub env_vars: HashMap<String, String>,
    /// Kept separate from `repo_url` so it never ends up in a log line or
    /// error message formatted from the URL alone.
    pub access_token: Option<String>,
}

impl EnvironmentConfig {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            branch: "main".into(),
            env_vars: HashMap::new(),
            access_token: None,
        }
    }
}

/// One tracked (already-known-to-git) modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedChange {
    pub path: String,
    pub unified_diff: String,
}

/// One file git does not know about yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntrackedFile {
    pub path: String,
    pub content: String,
}

/// The structured capture of what a command did to the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub tracked: Vec<TrackedChange>,
    pub untracked: Vec<UntrackedFile>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty() && self.untracked.is_empty()
    }
}

/// Which leg of the response-thread state machine a `respond` call is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePhase {
    Initial,
    Update,
    Final,
}

/// `(provider, thread_id)` — a provider-opaque token reused across the
/// `initial -> update* -> final` sequence for one invocation.
#[derive(Debug, Clone)]
pub struct ResponseThread {
    pub provider: Provider,
    pub thread_id: String,
}

/// The outcome of running a command inside the sandbox.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub exit_code: i32,
    pub combined_output: String,
}

impl ExecutionOutcome {
    pub fn stderr_excerpt(&self, max_chars: usize) -> String {
        let total = self.combined_output.chars().count();
        if total <= max_chars {
            return self.combined_output.clone();
        }
        self.combined_output.chars().skip(total - max_chars).collect()
    }
}

/// A lowercase hex token minted once per invocation, reused as the
/// response-thread key, the container-name suffix, and the branch suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn new() -> Self {
        let bytes: [u8; 8] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
