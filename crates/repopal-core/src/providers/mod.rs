pub mod github;
pub mod slack;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::types::{Event, Provider, ResponsePhase};

/// `{validate, normalize, respond}` — the full capability set a provider
/// adapter exposes. One implementation per supported `Provider` variant.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Verify the request was actually sent by this provider. Must hash the
    /// bytes as received — never a re-serialized form (P2).
    fn validate(&self, headers: &HeaderMap, raw_body: &[u8]) -> bool;

    /// Tagged dispatch from a raw JSON payload to a normalized `Event`.
    /// `raw_payload` on the returned event must equal `payload` (P3).
    fn normalize(&self, payload: serde_json::Value) -> Event;

    /// Post a new thread message (`thread_id.is_none()`) or edit an existing
    /// one, returning the thread id to reuse for subsequent calls.
    async fn respond(
        &self,
        event: &Event,
        message: &str,
        phase: ResponsePhase,
        thread_id: Option<&str>,
    ) -> Result<String, PipelineError>;
}

/// A minimal case-insensitive header lookup so adapters don't depend on any
/// particular HTTP framework's header type.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap(Vec<(String, String)>);

impl HeaderMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// `sha256=<hex hmac>` (GitHub) or `v0=<hex hmac>` (Slack) against the
/// verbatim message bytes. Constant-time compare via `hmac`'s own
/// `verify_slice`.
pub(crate) fn verify_hmac_sha256(secret: &str, message: &[u8], expected_hex_with_prefix: &str, prefix: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let Some(hex_sig) = expected_hex_with_prefix.strip_prefix(prefix) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&sig_bytes).is_ok()
}
