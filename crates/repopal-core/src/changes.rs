//! Change extraction (C5): turns a working tree's git state into a
//! [`ChangeSet`] after a command has run. Never mutates the tree it reads.

use anyhow::{Context, Result};
use tracing::warn;

use crate::git::Git;
use crate::types::{ChangeSet, TrackedChange, UntrackedFile};

/// Build a `ChangeSet` from `dir`: tracked modifications relative to HEAD
/// (each as a per-file unified diff) plus untracked files (each read whole),
/// both sorted lexicographically by path. Untracked files that aren't valid
/// UTF-8 are skipped with a warning rather than failing the extraction —
/// binary artifacts are out of scope for this pipeline's diff/summary story.
pub fn extract(git: &Git, dir: &str) -> Result<ChangeSet> {
    let mut tracked_paths = git.changed_paths(dir).context("failed to list changed paths")?;
    tracked_paths.sort();

    let mut tracked = Vec::with_capacity(tracked_paths.len());
    for path in tracked_paths {
        let unified_diff = git.diff_path(dir, &path).with_context(|| format!("failed to diff {path}"))?;
        tracked.push(TrackedChange { path, unified_diff });
    }

    let mut untracked_paths = git.untracked_paths(dir).context("failed to list untracked paths")?;
    untracked_paths.sort();

    let mut untracked = Vec::with_capacity(untracked_paths.len());
    for path in untracked_paths {
        let full_path = std::path::Path::new(dir).join(&path);
        match std::fs::read(&full_path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => untracked.push(UntrackedFile { path, content }),
                Err(_) => warn!(%path, "skipping untracked file: not valid UTF-8"),
            },
            Err(err) => warn!(%path, %err, "skipping untracked file: failed to read"),
        }
    }

    Ok(ChangeSet { tracked, untracked })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command;

    fn init_repo(dir: &std::path::Path) -> Git {
        Command::new("git").arg("init").arg("-q").arg(dir).output().unwrap();
        let git = Git::new(dir.to_string_lossy().to_string());
        git.exec(&git.repo_path, &["config", "user.email", "test@example.com"]).unwrap();
        git.exec(&git.repo_path, &["config", "user.name", "test"]).unwrap();
        fs::write(dir.join("a.txt"), "hello\n").unwrap();
        git.exec(&git.repo_path, &["add", "-A"]).unwrap();
        git.exec(&git.repo_path, &["commit", "-m", "initial"]).unwrap();
        git
    }

    #[test]
    fn extract_separates_tracked_and_untracked_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let git = init_repo(tmp.path());
        fs::write(tmp.path().join("a.txt"), "hello world\n").unwrap();
        fs::write(tmp.path().join("LICENSE"), "MIT\n").unwrap();

        let change_set = extract(&git, &git.repo_path).unwrap();
        assert_eq!(change_set.tracked.len(), 1);
        assert_eq!(change_set.tracked[0].path, "a.txt");
        assert!(change_set.tracked[0].unified_diff.contains("+hello world"));
        assert_eq!(change_set.untracked.len(), 1);
        assert_eq!(change_set.untracked[0].path, "LICENSE");
        assert_eq!(change_set.untracked[0].content, "MIT\n");
    }

    #[test]
    fn extract_returns_empty_change_set_when_nothing_changed() {
        let tmp = tempfile::tempdir().unwrap();
        let git = init_repo(tmp.path());
        let change_set = extract(&git, &git.repo_path).unwrap();
        assert!(change_set.is_empty());
    }

    #[test]
    fn extract_skips_non_utf8_untracked_files() {
        let tmp = tempfile::tempdir().unwrap();
        let git = init_repo(tmp.path());
        fs::write(tmp.path().join("binary.dat"), [0xff, 0xfe, 0x00, 0xff]).unwrap();
        fs::write(tmp.path().join("NOTES.md"), "notes\n").unwrap();

        let change_set = extract(&git, &git.repo_path).unwrap();
        let paths: Vec<&str> = change_set.untracked.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(paths, vec!["NOTES.md"]);
    }
}
