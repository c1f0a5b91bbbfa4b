//! Publishing (C6): commit what the sandbox produced onto a fresh branch,
//! push it, and open a pull request. Built on [`crate::git`] for the local
//! steps and a single `reqwest` call for the PR itself — same posture as
//! the provider adapters, which also hand-roll REST calls rather than
//! pulling in a GitHub client crate.

use anyhow::Context;
use serde_json::Value;

use crate::error::PipelineError;
use crate::git::Git;
use crate::types::CorrelationId;

pub fn branch_name(correlation_id: &CorrelationId) -> String {
    format!("repopal/{correlation_id}")
}

/// Stage, commit, and push everything the sandbox left in `dir` onto a new
/// `repopal/{correlation_id}` branch. Returns `Ok(false)` (no error) when
/// there was nothing to commit, so the caller can skip opening a PR.
pub async fn commit_and_push(
    git: &Git,
    dir: &str,
    correlation_id: &CorrelationId,
    commit_message: &str,
) -> Result<bool, PipelineError> {
    let branch = branch_name(correlation_id);
    let git = Git::new(git.repo_path.clone());
    let dir = dir.to_string();
    let message = commit_message.to_string();

    tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        git.create_branch(&dir, &branch)?;
        let committed = git.commit_all(&dir, &message)?;
        if !committed {
            return Ok(false);
        }
        git.push_branch(&dir, &branch)?;
        Ok(true)
    })
    .await
    .map_err(|e| PipelineError::publish(format!("commit/push task panicked: {e}")))?
    .map_err(|e| PipelineError::publish(e.to_string()))
}

/// Open a pull request from `repopal/{correlation_id}` against `base`,
/// returning its HTML URL.
pub async fn open_pull_request(
    client: &reqwest::Client,
    token: &str,
    repo_full_name: &str,
    correlation_id: &CorrelationId,
    base: &str,
    title: &str,
    body: &str,
) -> Result<String, PipelineError> {
    let url = format!("https://api.github.com/repos/{repo_full_name}/pulls");
    let branch = branch_name(correlation_id);

    let resp = client
        .post(&url)
        .bearer_auth(token)
        .header("User-Agent", "repopal")
        .json(&serde_json::json!({
            "title": title,
            "body": body,
            "head": branch,
            "base": base,
        }))
        .send()
        .await
        .map_err(|e| PipelineError::publish(e.to_string()))?;

    let body: Value = resp.json().await.map_err(|e| PipelineError::publish(e.to_string()))?;
    body.get("html_url")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .context("github pull request response missing html_url")
        .map_err(|e| PipelineError::publish(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command;

    #[test]
    fn branch_name_is_namespaced_by_correlation_id() {
        let id = CorrelationId("deadbeef".into());
        assert_eq!(branch_name(&id), "repopal/deadbeef");
    }

    /// A working tree with a bare "origin" remote it can actually push to,
    /// so `commit_and_push` can be exercised end to end without a real
    /// github token (C6 steps 1-4 are local git, not GitHub API calls).
    fn init_repo_with_origin(tmp: &std::path::Path) -> Git {
        let bare = tmp.join("origin.git");
        Command::new("git").args(["init", "--bare", "-q"]).arg(&bare).output().unwrap();

        let work = tmp.join("work");
        Command::new("git").arg("init").arg("-q").arg(&work).output().unwrap();
        let git = Git::new(work.to_string_lossy().to_string());
        git.exec(&git.repo_path, &["config", "user.email", "test@example.com"]).unwrap();
        git.exec(&git.repo_path, &["config", "user.name", "test"]).unwrap();
        fs::write(work.join("file.txt"), "hello\n").unwrap();
        git.exec(&git.repo_path, &["add", "-A"]).unwrap();
        git.exec(&git.repo_path, &["commit", "-m", "initial"]).unwrap();
        git.exec(&git.repo_path, &["remote", "add", "origin", &bare.to_string_lossy()]).unwrap();
        let push = git.exec(&git.repo_path, &["push", "origin", "HEAD:main"]).unwrap();
        assert!(push.success(), "seed push failed: {}", push.combined_output());
        git
    }

    #[tokio::test]
    async fn commit_and_push_lands_branch_and_commit_on_origin_without_a_github_token() {
        let tmp = tempfile::tempdir().unwrap();
        let git = init_repo_with_origin(tmp.path());
        fs::write(std::path::Path::new(&git.repo_path).join("file.txt"), "hello world\n").unwrap();

        let correlation_id = CorrelationId("deadbeef".into());
        let committed = commit_and_push(&git, &git.repo_path, &correlation_id, "repopal: test change")
            .await
            .unwrap();
        assert!(committed);

        let branches = git.exec(&git.repo_path, &["branch", "-r"]).unwrap();
        assert!(branches.stdout.contains("origin/repopal/deadbeef"));

        let subject = git
            .exec(&git.repo_path, &["log", "-1", "--format=%s", "origin/repopal/deadbeef"])
            .unwrap();
        assert_eq!(subject.stdout.trim(), "repopal: test change");
    }

    #[tokio::test]
    async fn commit_and_push_skips_branch_push_when_there_is_nothing_to_commit() {
        let tmp = tempfile::tempdir().unwrap();
        let git = init_repo_with_origin(tmp.path());

        let correlation_id = CorrelationId("noop".into());
        let committed = commit_and_push(&git, &git.repo_path, &correlation_id, "repopal: test change")
            .await
            .unwrap();
        assert!(!committed);

        let branches = git.exec(&git.repo_path, &["branch", "-r"]).unwrap();
        assert!(!branches.stdout.contains("repopal/noop"));
    }
}
