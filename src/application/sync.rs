//! Background `git pull` of the content repository.

use std::{path::PathBuf, process::Output, time::Instant};

use tokio::{process::Command, task::JoinHandle};
use tracing::{info, warn};

const SOURCE: &str = "taccuino::sync";

/// Pulls the content repository after a verified webhook.
///
/// The pull runs detached: the caller never waits for it, and the catalog it
/// refreshes alongside may not include the pulled changes yet.
#[derive(Debug, Clone)]
pub struct RepositorySync {
    git_binary: String,
    repo_dir: PathBuf,
}

impl RepositorySync {
    pub fn new(git_binary: impl Into<String>, repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_binary: git_binary.into(),
            repo_dir: repo_dir.into(),
        }
    }

    /// Launch `git -C <repo_dir> pull --rebase` in the background.
    pub fn spawn(&self) -> JoinHandle<()> {
        let sync = self.clone();
        tokio::spawn(async move { sync.pull().await })
    }

    async fn pull(&self) {
        let started_at = Instant::now();
        let result = Command::new(&self.git_binary)
            .arg("-C")
            .arg(&self.repo_dir)
            .args(["pull", "--rebase"])
            .output()
            .await;

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        match result {
            Ok(output) if output.status.success() => info!(
                target = SOURCE,
                repo = %self.repo_dir.display(),
                elapsed_ms,
                stdout = %trimmed(&output.stdout),
                "Repository pulled"
            ),
            Ok(output) => log_failed_pull(&self.repo_dir, &output, elapsed_ms),
            Err(err) => warn!(
                target = SOURCE,
                repo = %self.repo_dir.display(),
                git = %self.git_binary,
                error = %err,
                "Failed to launch git"
            ),
        }
    }
}

fn log_failed_pull(repo_dir: &std::path::Path, output: &Output, elapsed_ms: u64) {
    warn!(
        target = SOURCE,
        repo = %repo_dir.display(),
        status = %output.status,
        elapsed_ms,
        stderr = %trimmed(&output.stderr),
        "Repository pull failed"
    );
}

fn trimmed(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_git_binary_is_logged_not_fatal() {
        let sync = RepositorySync::new("taccuino-no-such-git", ".");
        sync.spawn().await.expect("task completes");
    }

    #[tokio::test]
    async fn pull_outside_a_repository_completes() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let sync = RepositorySync::new("git", dir.path());
        // Fails inside git (or to launch it); either way the task finishes.
        sync.spawn().await.expect("task completes");
    }
}
