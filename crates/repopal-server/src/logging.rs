use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `Registry` + `EnvFilter` + `fmt`, default `info`, overridable via
/// `REPOPAL_LOG` (falling back to `RUST_LOG`, tracing-subscriber's own
/// default env var) so `REPOPAL_LOG=debug cargo run` works without clobbering
/// other crates' `RUST_LOG` expectations in a shared shell.
pub fn init() {
    let filter = std::env::var("REPOPAL_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|s| tracing_subscriber::EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("repopal_server=info,repopal_core=info,repopal_llm=info,tower_http=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
