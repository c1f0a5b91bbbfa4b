use thiserror::Error;

/// The closed set of error kinds the orchestrator and HTTP layer branch on.
/// Lower-level failures (I/O, HTTP, git subprocess) are wrapped into the
/// nearest-fitting variant at the component boundary rather than leaking
/// their concrete types up through the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("signature invalid")]
    SignatureInvalid,

    #[error("unsupported provider")]
    UnsupportedProvider,

    #[error("unsupported event kind")]
    UnsupportedEventKind,

    #[error("no command available for this event")]
    NoCommandAvailable,

    #[error("planner failure: {detail}")]
    PlannerFailure { detail: String },

    #[error("sandbox failure: {detail}")]
    SandboxFailure { detail: String },

    #[error("command failed (exit {exit_code}): {stderr_excerpt}")]
    CommandFailure { exit_code: i32, stderr_excerpt: String },

    #[error("publish failure: {detail}")]
    PublishFailure { detail: String },

    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    /// The diagnostic text posted into the final thread update.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn planner(detail: impl Into<String>) -> Self {
        Self::PlannerFailure { detail: detail.into() }
    }

    pub fn sandbox(detail: impl Into<String>) -> Self {
        Self::SandboxFailure { detail: detail.into() }
    }

    pub fn publish(detail: impl Into<String>) -> Self {
        Self::PublishFailure { detail: detail.into() }
    }
}
