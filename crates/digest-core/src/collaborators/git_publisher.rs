//! A [`Publisher`] that commits the rendered digest into a local git
//! checkout, shelling out to the `git` binary rather than linking a git
//! library -- the same process-spawn idiom used elsewhere in this crate
//! for filesystem-affecting operations.

use std::path::PathBuf;
use std::process::Command;

use async_trait::async_trait;

use super::trait_def::Publisher;

/// Writes `<repo_path>/<content_dir>/<date>-daily.md` and commits it.
///
/// Idempotent for a given date: if the file's content is unchanged from
/// the last commit, `git commit` finds nothing staged and this is a no-op
/// (detected via `git status --porcelain`).
pub struct GitRepoPublisher {
    repo_path: PathBuf,
    content_dir: String,
    commit_author: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GitPublishError {
    #[error("failed to run git {0}: {1}")]
    GitCommand(&'static str, std::io::Error),
    #[error("git {0} failed: {1}")]
    GitFailed(&'static str, String),
    #[error("failed to write digest file: {0}")]
    Io(#[from] std::io::Error),
}

impl GitRepoPublisher {
    pub fn new(
        repo_path: impl Into<PathBuf>,
        content_dir: impl Into<String>,
        commit_author: impl Into<String>,
    ) -> Self {
        Self {
            repo_path: repo_path.into(),
            content_dir: content_dir.into(),
            commit_author: commit_author.into(),
        }
    }

    fn run_git(&self, args: &[&str], step: &'static str) -> Result<std::process::Output, GitPublishError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| GitPublishError::GitCommand(step, e))?;
        Ok(output)
    }
}

#[async_trait]
impl Publisher for GitRepoPublisher {
    fn name(&self) -> &str {
        "git-repo"
    }

    async fn publish(&self, markdown: &str, date: chrono::NaiveDate) -> anyhow::Result<()> {
        let file_name = format!("{date}-daily.md");
        let rel_path = format!("{}/{file_name}", self.content_dir);
        let abs_path = self.repo_path.join(&rel_path);

        if let Some(parent) = abs_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&abs_path, markdown)?;

        let status_output = self.run_git(&["status", "--porcelain", &rel_path], "status")?;
        if String::from_utf8_lossy(&status_output.stdout).trim().is_empty() {
            // No change since the last publish for this date: idempotent no-op.
            return Ok(());
        }

        let add_output = self.run_git(&["add", &rel_path], "add")?;
        if !add_output.status.success() {
            return Err(GitPublishError::GitFailed(
                "add",
                String::from_utf8_lossy(&add_output.stderr).into_owned(),
            )
            .into());
        }

        let message = format!("Publish daily digest for {date}");
        let commit_output = self.run_git(
            &[
                "-c",
                &format!("user.name={}", self.commit_author),
                "-c",
                "user.email=digestd@localhost",
                "commit",
                "-m",
                &message,
            ],
            "commit",
        )?;
        if !commit_output.status.success() {
            return Err(GitPublishError::GitFailed(
                "commit",
                String::from_utf8_lossy(&commit_output.stderr).into_owned(),
            )
            .into());
        }

        Ok(())
    }
}
