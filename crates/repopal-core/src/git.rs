use std::process::Command;

use anyhow::{anyhow, Context, Result};

pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Thin wrapper over the `git` binary. Every method shells out synchronously;
/// callers on the async path run it through `tokio::task::spawn_blocking` so
/// a slow clone or push doesn't stall the pipeline's cooperative scheduler.
pub struct Git {
    pub repo_path: String,
}

impl Git {
    pub fn new(repo_path: impl Into<String>) -> Self {
        Self { repo_path: repo_path.into() }
    }

    pub fn exec(&self, dir: &str, args: &[&str]) -> Result<ExecResult> {
        self.exec_env(dir, args, &[])
    }

    pub fn exec_env(&self, dir: &str, args: &[&str], env: &[(&str, &str)]) -> Result<ExecResult> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(dir);
        cmd.args(args);
        for (k, v) in env {
            cmd.env(k, v);
        }

        let output = cmd
            .output()
            .with_context(|| format!("failed to spawn git -C {dir} {}", args.join(" ")))?;

        Ok(ExecResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(1),
        })
    }

    /// Clone `branch` of `url` into `dest`, which must not already exist.
    /// `url` may already carry spliced credentials (see `EnvironmentConfig`).
    pub fn clone_branch(url: &str, branch: &str, dest: &str) -> Result<()> {
        let output = Command::new("git")
            .args(["clone", "--branch", branch, "--single-branch", url, dest])
            .output()
            .context("failed to spawn git clone")?;
        if !output.status.success() {
            return Err(anyhow!(
                "git clone failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        Ok(())
    }

    pub fn rev_parse_head(&self) -> Result<String> {
        let result = self.exec(&self.repo_path, &["rev-parse", "HEAD"])?;
        if !result.success() {
            return Err(anyhow!("git rev-parse HEAD failed: {}", result.combined_output()));
        }
        Ok(result.stdout.trim().to_string())
    }

    pub fn create_branch(&self, dir: &str, branch: &str) -> Result<()> {
        let result = self.exec(dir, &["checkout", "-b", branch])?;
        if !result.success() {
            return Err(anyhow!(
                "git checkout -b {branch} failed: {}",
                result.combined_output()
            ));
        }
        Ok(())
    }

    /// Stage everything (tracked modifications and untracked files, honoring
    /// .gitignore) and commit. Returns `false` if there was nothing to
    /// commit.
    pub fn commit_all(&self, dir: &str, message: &str) -> Result<bool> {
        let add = self.exec(dir, &["add", "-A"])?;
        if !add.success() {
            return Err(anyhow!("git add -A failed: {}", add.combined_output()));
        }

        let status = self.exec(dir, &["status", "--porcelain"])?;
        if status.stdout.trim().is_empty() {
            return Ok(false);
        }

        let result = self.exec(dir, &["commit", "-m", message])?;
        if !result.success() {
            return Err(anyhow!("git commit failed: {}", result.combined_output()));
        }
        Ok(true)
    }

    pub fn push_branch(&self, dir: &str, branch: &str) -> Result<()> {
        let result = self.exec(dir, &["push", "origin", branch])?;
        if !result.success() {
            return Err(anyhow!(
                "git push origin {branch} failed: {}",
                result.combined_output()
            ));
        }
        Ok(())
    }

    /// Paths with tracked modifications relative to HEAD, one per line from
    /// `git diff --name-only HEAD`, filtered for empties.
    pub fn changed_paths(&self, dir: &str) -> Result<Vec<String>> {
        let result = self.exec(dir, &["diff", "--name-only", "HEAD"])?;
        if !result.success() {
            return Err(anyhow!(
                "git diff --name-only HEAD failed: {}",
                result.combined_output()
            ));
        }
        Ok(result.stdout.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
    }

    /// The unified diff of a single tracked path against HEAD.
    pub fn diff_path(&self, dir: &str, path: &str) -> Result<String> {
        let result = self.exec(dir, &["diff", "HEAD", "--", path])?;
        if !result.success() {
            return Err(anyhow!("git diff HEAD -- {path} failed: {}", result.combined_output()));
        }
        Ok(result.stdout)
    }

    /// Untracked files, respecting .gitignore, one per line from
    /// `git ls-files --others --exclude-standard`.
    pub fn untracked_paths(&self, dir: &str) -> Result<Vec<String>> {
        let result = self.exec(dir, &["ls-files", "--others", "--exclude-standard"])?;
        if !result.success() {
            return Err(anyhow!(
                "git ls-files --others --exclude-standard failed: {}",
                result.combined_output()
            ));
        }
        Ok(result.stdout.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn init_repo(dir: &std::path::Path) -> Git {
        Command::new("git").arg("init").arg("-q").arg(dir).output().unwrap();
        let git = Git::new(dir.to_string_lossy().to_string());
        git.exec(&git.repo_path, &["config", "user.email", "test@example.com"]).unwrap();
        git.exec(&git.repo_path, &["config", "user.name", "test"]).unwrap();
        fs::write(dir.join("file.txt"), "hello\n").unwrap();
        git.exec(&git.repo_path, &["add", "-A"]).unwrap();
        git.exec(&git.repo_path, &["commit", "-m", "initial"]).unwrap();
        git
    }

    #[test]
    fn changed_paths_reports_tracked_modification() {
        let tmp = tempfile::tempdir().unwrap();
        let git = init_repo(tmp.path());
        fs::write(tmp.path().join("file.txt"), "hello world\n").unwrap();
        let changed = git.changed_paths(&git.repo_path).unwrap();
        assert_eq!(changed, vec!["file.txt".to_string()]);
        let diff = git.diff_path(&git.repo_path, "file.txt").unwrap();
        assert!(diff.contains("-hello"));
        assert!(diff.contains("+hello world"));
    }

    #[test]
    fn untracked_paths_reports_new_file_only() {
        let tmp = tempfile::tempdir().unwrap();
        let git = init_repo(tmp.path());
        fs::write(tmp.path().join("NEW.md"), "new\n").unwrap();
        let untracked = git.untracked_paths(&git.repo_path).unwrap();
        assert_eq!(untracked, vec!["NEW.md".to_string()]);
        assert!(git.changed_paths(&git.repo_path).unwrap().is_empty());
    }

    #[test]
    fn commit_all_returns_false_when_nothing_changed() {
        let tmp = tempfile::tempdir().unwrap();
        let git = init_repo(tmp.path());
        let changed = git.commit_all(&git.repo_path, "no-op").unwrap();
        assert!(!changed);
    }
}
