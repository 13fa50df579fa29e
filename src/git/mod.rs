//! Git-based package probing
//!
//! Packages in git-managed projects have no source entries on the
//! build-service API; their last-change time is the author time of the
//! newest commit on the project's branch. The probe shallow-clones the
//! package repository into a temporary directory, which is removed on
//! every exit path.

use crate::Timestamp;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Errors from one git probe; all of them are per-package failures, not
/// fatal for the batch
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// Clone exited non-zero (missing branch, missing repo, network)
    #[error("could not clone {url}: {stderr}")]
    CloneFailed { url: String, stderr: String },

    /// The clone succeeded but the last commit time could not be read
    #[error("could not read last commit time: {reason}")]
    Log { reason: String },

    /// Spawning git or creating the temporary directory failed
    #[error("git invocation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Probe for packages hosted on the git server
pub struct GitSource {
    gitserver_url: String,
}

impl GitSource {
    pub fn new(gitserver_url: impl Into<String>) -> Self {
        Self {
            gitserver_url: gitserver_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Verify the git executable exists.
    ///
    /// Called once before a batch touches any git-managed origin, so a
    /// missing executable aborts the run instead of failing every package
    /// differently.
    pub fn ensure_git_available() -> crate::Result<()> {
        let available = Command::new("git")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);

        if available {
            Ok(())
        } else {
            Err(crate::BundlewatchError::Git(
                "'git' not found. Please check that it's available in $PATH.".to_string(),
            ))
        }
    }

    /// Check whether the package's branch has a commit newer than
    /// `last_check`.
    ///
    /// The branch is derived from the project identifier and the
    /// repository is cloned with depth 1, so only the newest commit is
    /// transferred.
    pub fn package_was_updated(
        &self,
        last_check: Timestamp,
        project: &str,
        package: &str,
    ) -> Result<bool, GitError> {
        let workdir = tempfile::TempDir::new()?;
        let repo_dir = self.shallow_clone(project, package, workdir.path())?;
        let last_commit = last_commit_time(&repo_dir)?;

        debug!(
            package = %package,
            last_commit,
            last_check,
            "read last commit time"
        );

        Ok(last_commit > last_check)
    }

    fn shallow_clone(
        &self,
        project: &str,
        package: &str,
        working_dir: &Path,
    ) -> Result<PathBuf, GitError> {
        let branch = branch_slug(project);
        let url = format!("{}/pool/{}", self.gitserver_url, package);

        let output = Command::new("git")
            .args([
                "clone",
                "--depth=1",
                &format!("--branch={}", branch),
                &url,
            ])
            .current_dir(working_dir)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(url = %url, branch = %branch, "clone failed");
            return Err(GitError::CloneFailed { url, stderr });
        }

        Ok(working_dir.join(package))
    }
}

/// Branch name for a project: the `SUSE:` prefix is dropped, remaining
/// separators become hyphens, lowercase. Project `SUSE:SLFO:Main` lives on
/// branch `slfo-main` in `pool/<package>`.
pub fn branch_slug(project: &str) -> String {
    project
        .strip_prefix("SUSE:")
        .unwrap_or(project)
        .replace(':', "-")
        .to_lowercase()
}

fn last_commit_time(repo_dir: &Path) -> Result<Timestamp, GitError> {
    // %at is the author time of the commit
    let output = Command::new("git")
        .args(["log", "-1", "--format=%at"])
        .env("GIT_PAGER", "")
        .current_dir(repo_dir)
        .output()?;

    if !output.status.success() {
        return Err(GitError::Log {
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_commit_timestamp(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        GitError::Log {
            reason: "log output is not a Unix timestamp".to_string(),
        }
    })
}

fn parse_commit_timestamp(stdout: &str) -> Option<Timestamp> {
    stdout.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_slug_strips_prefix_and_lowercases() {
        assert_eq!(branch_slug("SUSE:SLFO:Main"), "slfo-main");
        assert_eq!(branch_slug("openSUSE:Factory"), "opensuse-factory");
        assert_eq!(branch_slug("SUSE:SLE-15-SP6:Update"), "sle-15-sp6-update");
    }

    #[test]
    fn test_branch_slug_without_prefix() {
        assert_eq!(branch_slug("devel:languages:python"), "devel-languages-python");
    }

    #[test]
    fn test_parse_commit_timestamp() {
        assert_eq!(parse_commit_timestamp("1649762596\n"), Some(1649762596));
        assert_eq!(parse_commit_timestamp("  1649762596  "), Some(1649762596));
        assert_eq!(parse_commit_timestamp(""), None);
        assert_eq!(parse_commit_timestamp("not-a-time"), None);
    }

    #[test]
    fn test_gitserver_url_trailing_slash() {
        let source = GitSource::new("https://src.opensuse.org/");
        assert_eq!(source.gitserver_url, "https://src.opensuse.org");
    }

    #[test]
    fn test_clone_of_missing_repo_fails_per_package() {
        // Requires a git binary; skip quietly where none is installed.
        if GitSource::ensure_git_available().is_err() {
            return;
        }

        let workdir = tempfile::TempDir::new().unwrap();
        let source = GitSource::new(format!(
            "file://{}/no-such-server",
            workdir.path().display()
        ));

        let err = source
            .package_was_updated(0, "SUSE:SLFO:Main", "no-such-package")
            .unwrap_err();
        assert!(matches!(err, GitError::CloneFailed { .. }));
        // The temporary directory is gone regardless of the failure.
    }
}
