//! Publishing rendered artifacts to the static host.
//!
//! Artifacts are committed and pushed with git; the pages host then serves
//! them from `https://{host_id}.github.io/`.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::DayKey;
use crate::errors::{DealflowError, Result};
use crate::utils::commit_timestamp;

/// Public URLs on the pages host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagesHost {
    host_id: String,
}

impl PagesHost {
    /// Creates a host for the given account id.
    #[must_use]
    pub fn new(host_id: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
        }
    }

    /// Root URL of the site.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}.github.io", self.host_id)
    }

    /// Public URL of one card of a day.
    #[must_use]
    pub fn artifact_url(&self, date: &DayKey, file: &str) -> String {
        format!("{}/images/{date}/{file}", self.base_url())
    }
}

/// Pushes the working tree to the external host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Returns `Ok(true)` when the artifacts were pushed.
    async fn publish(&self) -> Result<bool>;
}

/// Result of one git invocation.
#[derive(Debug, Clone)]
struct GitOutput {
    success: bool,
    stderr: String,
}

/// Publishes by running `git add`, `git commit` and `git push`.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_dir: PathBuf,
    remote: String,
    branch: String,
}

impl GitPublisher {
    /// Creates a publisher for the repository at `repo_dir`.
    #[must_use]
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        remote: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<GitOutput> {
        debug!(?args, "Running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|e| DealflowError::Publish(format!("cannot run git: {e}")))?;
        Ok(GitOutput {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[async_trait]
impl ArtifactPublisher for GitPublisher {
    async fn publish(&self) -> Result<bool> {
        if !self.repo_dir.join(".git").exists() {
            warn!(dir = %self.repo_dir.display(), "No git repository, nothing published");
            return Ok(false);
        }

        let add = self.git(&["add", "."]).await?;
        if !add.success {
            return Err(DealflowError::Publish(format!("git add failed: {}", add.stderr)));
        }

        let message = format!("Auto update: {}", commit_timestamp());
        let commit = self.git(&["commit", "-m", &message]).await?;
        if !commit.success {
            // Usually "nothing to commit"; the push still decides the outcome.
            warn!(stderr = %commit.stderr, "git commit did not create a commit");
        }

        let push = self.git(&["push", &self.remote, &self.branch]).await?;
        if push.success {
            info!(remote = %self.remote, branch = %self.branch, "Artifacts pushed");
        } else {
            warn!(stderr = %push.stderr, "git push failed");
        }
        Ok(push.success)
    }
}
