use std::collections::HashMap;

use anyhow::Result;

/// Process-level configuration: provider secrets/tokens, LLM settings, and
/// the defaults that make local development safe without any of it set.
///
/// Loaded once at startup via [`Config::from_env`]; real environment
/// variables take precedence over a `.env` file in the working directory,
/// which in turn takes precedence over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub github_webhook_secret: String,
    pub github_token: String,
    pub slack_signing_secret: String,
    pub slack_bot_token: String,

    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: String,
    pub llm_base_url: String,

    pub container_runtime: String,
    pub invocation_timeout_s: u64,

    /// Used when an event carries no repository of its own (e.g. a Slack
    /// slash command with no GitHub context attached).
    pub default_repo_url: String,
    pub default_base_branch: String,

    pub bind_addr: String,
    pub port: u16,
}

fn parse_dotenv() -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return map;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    map
}

fn get(key: &str, dotenv: &HashMap<String, String>) -> Option<String> {
    std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
}

fn get_str(key: &str, dotenv: &HashMap<String, String>, default: &str) -> String {
    get(key, dotenv).unwrap_or_else(|| default.to_string())
}

fn get_u64(key: &str, dotenv: &HashMap<String, String>, default: u64) -> u64 {
    get(key, dotenv).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn get_u16(key: &str, dotenv: &HashMap<String, String>, default: u16) -> u16 {
    get(key, dotenv).and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let dotenv = parse_dotenv();
        Ok(Self {
            github_webhook_secret: get_str("REPOPAL_GITHUB_WEBHOOK_SECRET", &dotenv, ""),
            github_token: get_str("REPOPAL_GITHUB_TOKEN", &dotenv, ""),
            slack_signing_secret: get_str("REPOPAL_SLACK_SIGNING_SECRET", &dotenv, ""),
            slack_bot_token: get_str("REPOPAL_SLACK_BOT_TOKEN", &dotenv, ""),

            llm_provider: get_str("REPOPAL_LLM_PROVIDER", &dotenv, "openai"),
            llm_model: get_str("REPOPAL_LLM_MODEL", &dotenv, "gpt-4o-mini"),
            llm_api_key: get_str("REPOPAL_LLM_API_KEY", &dotenv, ""),
            llm_base_url: get_str(
                "REPOPAL_LLM_BASE_URL",
                &dotenv,
                "https://api.openai.com/v1",
            ),

            container_runtime: get_str("REPOPAL_CONTAINER_RUNTIME", &dotenv, "docker"),
            invocation_timeout_s: get_u64("REPOPAL_INVOCATION_TIMEOUT_S", &dotenv, 600),

            default_repo_url: get_str("REPOPAL_DEFAULT_REPO_URL", &dotenv, ""),
            default_base_branch: get_str("REPOPAL_DEFAULT_BASE_BRANCH", &dotenv, "main"),

            bind_addr: get_str("REPOPAL_BIND_ADDR", &dotenv, "127.0.0.1"),
            port: get_u16("REPOPAL_PORT", &dotenv, 8080),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_webhook_secret: String::new(),
            github_token: String::new(),
            slack_signing_secret: String::new(),
            slack_bot_token: String::new(),
            llm_provider: "openai".into(),
            llm_model: "gpt-4o-mini".into(),
            llm_api_key: String::new(),
            llm_base_url: "https://api.openai.com/v1".into(),
            container_runtime: "docker".into(),
            invocation_timeout_s: 600,
            default_repo_url: String::new(),
            default_base_branch: "main".into(),
            bind_addr: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_safe_for_local_dev() {
        let cfg = Config {
            github_webhook_secret: String::new(),
            github_token: String::new(),
            slack_signing_secret: String::new(),
            slack_bot_token: String::new(),
            llm_provider: "openai".into(),
            llm_model: "gpt-4o-mini".into(),
            llm_api_key: String::new(),
            llm_base_url: "https://api.openai.com/v1".into(),
            container_runtime: "docker".into(),
            invocation_timeout_s: 600,
            default_repo_url: String::new(),
            default_base_branch: "main".into(),
            bind_addr: "127.0.0.1".into(),
            port: 8080,
        };
        assert_eq!(cfg.bind_addr, "127.0.0.1");
        assert!(cfg.github_webhook_secret.is_empty());
    }
}
