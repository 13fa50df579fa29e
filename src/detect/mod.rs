//! The detection pass
//!
//! One run iterates every configured origin, probes the metadata source
//! the origin was bound to at construction, and folds the outcomes into an
//! update report. Transport-level probe failures become per-package
//! entries in the failed list; malformed responses abort the run.

use crate::config::WatchConfig;
use crate::git::{GitError, GitSource};
use crate::obs::{ObsClient, ObsError};
use crate::report::{ReportRow, UpdateReport};
use crate::{Result, Timestamp};
use tracing::{debug, warn};

/// Which metadata source answers for an origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    /// Source entries on the build-service API
    BuildService,

    /// Commits on the git server
    Git,
}

/// One upstream package a bundle package tracks
#[derive(Debug, Clone)]
pub struct Origin {
    /// Name the origin is tracked under in the bundle
    pub bundle_name: String,

    /// Origin project
    pub project: String,

    /// Origin package name
    pub package: String,

    /// Metadata source, decided once at construction
    pub kind: OriginKind,
}

impl Origin {
    /// Build an origin from a config entry. The kind is Git iff the
    /// origin's project is listed in `git_managed_projects`; it is never
    /// re-checked after this point.
    pub fn from_config(
        bundle_name: &str,
        project: &str,
        package: &str,
        git_managed_projects: &[String],
    ) -> Self {
        let kind = if git_managed_projects.iter().any(|p| p == project) {
            OriginKind::Git
        } else {
            OriginKind::BuildService
        };

        Self {
            bundle_name: bundle_name.to_string(),
            project: project.to_string(),
            package: package.to_string(),
            kind,
        }
    }

    fn report_row(&self) -> ReportRow {
        ReportRow {
            bundle_name: self.bundle_name.clone(),
            project: self.project.clone(),
            package: self.package.clone(),
        }
    }
}

/// All origins from a config, in its (deterministic) mapping order
pub fn origins_from_config(config: &WatchConfig) -> Vec<Origin> {
    config
        .origins
        .iter()
        .map(|(bundle_name, entry)| {
            Origin::from_config(
                bundle_name,
                &entry.project,
                &entry.package,
                &config.obs.git_managed_projects,
            )
        })
        .collect()
}

/// Result of probing one origin.
///
/// A probe is exactly one of these; "updated" and "failed" cannot occur
/// together because a failed probe never reaches the newer-than
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Updated,
    Unchanged,
    Failed,
}

/// Runs one detection pass over a set of origins
pub struct UpdateDetector<'a> {
    obs: &'a ObsClient,
    git: &'a GitSource,
}

impl<'a> UpdateDetector<'a> {
    pub fn new(obs: &'a ObsClient, git: &'a GitSource) -> Self {
        Self { obs, git }
    }

    /// Probe every origin sequentially and aggregate the outcomes.
    ///
    /// If any origin is git-managed, the git executable is verified once
    /// up front so a missing tool aborts the run instead of producing a
    /// different failure per package.
    pub async fn run(&self, last_check: Timestamp, origins: &[Origin]) -> Result<UpdateReport> {
        if origins.iter().any(|o| o.kind == OriginKind::Git) {
            GitSource::ensure_git_available()?;
        }

        let mut report = UpdateReport::default();

        for origin in origins {
            let outcome = self.probe(last_check, origin).await?;
            debug!(
                bundle = %origin.bundle_name,
                package = %origin.package,
                ?outcome,
                "probed origin"
            );

            match outcome {
                ProbeOutcome::Updated => report.updated.push(origin.report_row()),
                ProbeOutcome::Unchanged => {}
                ProbeOutcome::Failed => report.failed.push(origin.report_row()),
            }
        }

        Ok(report)
    }

    async fn probe(&self, last_check: Timestamp, origin: &Origin) -> Result<ProbeOutcome> {
        match origin.kind {
            OriginKind::BuildService => classify_obs_probe(
                &origin.bundle_name,
                self.obs
                    .package_was_updated(last_check, &origin.project, &origin.package)
                    .await,
            ),
            OriginKind::Git => Ok(classify_git_probe(
                &origin.bundle_name,
                self.git
                    .package_was_updated(last_check, &origin.project, &origin.package),
            )),
        }
    }
}

/// Transport failures are per-package; parse failures abort the run.
fn classify_obs_probe(
    bundle_name: &str,
    result: std::result::Result<bool, ObsError>,
) -> Result<ProbeOutcome> {
    match result {
        Ok(true) => Ok(ProbeOutcome::Updated),
        Ok(false) => Ok(ProbeOutcome::Unchanged),
        Err(ObsError::Transport(e)) => {
            warn!(bundle = %bundle_name, error = %e, "build-service probe failed");
            Ok(ProbeOutcome::Failed)
        }
        Err(e @ ObsError::Parse(_)) => Err(e.into()),
    }
}

/// Every git probe error is a per-package failure; the only fatal git
/// condition (missing executable) is checked before the batch starts.
fn classify_git_probe(
    bundle_name: &str,
    result: std::result::Result<bool, GitError>,
) -> ProbeOutcome {
    match result {
        Ok(true) => ProbeOutcome::Updated,
        Ok(false) => ProbeOutcome::Unchanged,
        Err(e) => {
            warn!(bundle = %bundle_name, error = %e, "git probe failed");
            ProbeOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::TransportError;

    fn git_managed() -> Vec<String> {
        vec!["SUSE:SLFO:Main".to_string()]
    }

    #[test]
    fn test_origin_kind_decided_by_project_membership() {
        let obs_origin = Origin::from_config(
            "saltbundlepy",
            "SUSE:SLE-15-SP6:Update",
            "python311",
            &git_managed(),
        );
        assert_eq!(obs_origin.kind, OriginKind::BuildService);

        let git_origin = Origin::from_config(
            "saltbundlepy-cython",
            "SUSE:SLFO:Main",
            "python-Cython",
            &git_managed(),
        );
        assert_eq!(git_origin.kind, OriginKind::Git);
    }

    #[test]
    fn test_no_git_managed_projects_routes_everything_to_build_service() {
        let origins = [
            Origin::from_config("a", "SUSE:SLFO:Main", "pkg-a", &[]),
            Origin::from_config("b", "openSUSE:Factory", "pkg-b", &[]),
        ];
        assert!(origins.iter().all(|o| o.kind == OriginKind::BuildService));
    }

    #[test]
    fn test_obs_probe_classification() {
        assert_eq!(
            classify_obs_probe("a", Ok(true)).unwrap(),
            ProbeOutcome::Updated
        );
        assert_eq!(
            classify_obs_probe("a", Ok(false)).unwrap(),
            ProbeOutcome::Unchanged
        );

        let transport = ObsError::Transport(TransportError {
            url: "https://api.example/source/p/x".to_string(),
            reason: "502 Bad Gateway".to_string(),
        });
        assert_eq!(
            classify_obs_probe("a", Err(transport)).unwrap(),
            ProbeOutcome::Failed
        );
    }

    #[test]
    fn test_obs_parse_error_is_fatal() {
        let result = classify_obs_probe("a", Err(ObsError::Parse("truncated".to_string())));
        assert!(matches!(
            result.unwrap_err(),
            crate::BundlewatchError::Parse(_)
        ));
    }

    #[test]
    fn test_git_probe_classification() {
        assert_eq!(classify_git_probe("a", Ok(true)), ProbeOutcome::Updated);
        assert_eq!(classify_git_probe("a", Ok(false)), ProbeOutcome::Unchanged);
        assert_eq!(
            classify_git_probe(
                "a",
                Err(GitError::CloneFailed {
                    url: "https://src.example/pool/p".to_string(),
                    stderr: "fatal: Remote branch not found".to_string(),
                })
            ),
            ProbeOutcome::Failed
        );
    }
}
