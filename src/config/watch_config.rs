//! Watch configuration file handling
//!
//! Loads the TOML config describing which origin packages to watch and
//! where to file tracking issues.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "bundlewatch.toml";

/// Build-service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsSection {
    /// Base URL of the build-service API server
    #[serde(default = "default_api_baseurl")]
    pub api_baseurl: String,

    /// The project holding the bundle packages themselves
    pub bundle_project: String,

    /// Base URL of the git server hosting git-managed packages
    #[serde(default = "default_gitserver_baseurl")]
    pub gitserver_baseurl: String,

    /// Projects whose packages are tracked in git rather than the
    /// build-service source API
    #[serde(default)]
    pub git_managed_projects: Vec<String>,
}

fn default_api_baseurl() -> String {
    "https://api.opensuse.org".to_string()
}

fn default_gitserver_baseurl() -> String {
    "https://src.opensuse.org".to_string()
}

/// One watched origin: the upstream project/package a bundle package tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginEntry {
    /// Origin project name
    pub project: String,

    /// Origin package name (may differ from the bundle package name)
    pub package: String,
}

/// GitHub issue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSection {
    /// Repository in "owner/repo" form
    pub repo: String,

    /// Projects-V2 board node ID the issue is added to
    pub project_board_id: String,

    /// Issue content
    pub issue: IssueSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSection {
    /// Issue title
    pub title: String,

    /// Issue body template; `$updates`, `$last_execution`,
    /// `$last_execution_ts` and `$now` are substituted before filing
    pub body: String,

    /// Label names put on the created issue
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Watch configuration
///
/// Represents the complete TOML config file: build-service settings, the
/// `[origins]` table, and the GitHub issue section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Build-service settings
    pub obs: ObsSection,

    /// Watched origins keyed by bundle package name. A BTreeMap keeps
    /// detection and report ordering deterministic.
    pub origins: BTreeMap<String, OriginEntry>,

    /// GitHub issue settings; optional so the listing commands work
    /// without it
    #[serde(default)]
    pub github: Option<GithubSection>,
}

impl WatchConfig {
    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::BundlewatchError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let config: WatchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// The GitHub section, or a config error naming what is missing
    pub fn github(&self) -> Result<&GithubSection> {
        self.github.as_ref().ok_or_else(|| {
            crate::BundlewatchError::Config(
                "Missing [github] section in config file".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE_CONFIG: &str = r#"
        [obs]
        bundle_project = "systemsmanagement:saltbundle"
        git_managed_projects = ["SUSE:SLFO:Main"]

        [origins.saltbundlepy]
        project = "SUSE:SLE-15-SP6:Update"
        package = "python311"

        [origins.saltbundlepy-cython]
        project = "SUSE:SLFO:Main"
        package = "python-Cython"

        [github]
        repo = "org/bundle-tracker"
        project_board_id = "PVT_kwDOA"

        [github.issue]
        title = "Weekly origin update check"
        body = "Updates since $last_execution:\n\n$updates"
        labels = ["dependencies"]
    "#;

    #[test]
    fn test_parse_example_config() {
        let config: WatchConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();

        // Base URLs fall back to the public servers
        assert_eq!(config.obs.api_baseurl, "https://api.opensuse.org");
        assert_eq!(config.obs.gitserver_baseurl, "https://src.opensuse.org");
        assert_eq!(config.obs.bundle_project, "systemsmanagement:saltbundle");
        assert_eq!(config.obs.git_managed_projects, vec!["SUSE:SLFO:Main"]);

        assert_eq!(config.origins.len(), 2);
        let origin = &config.origins["saltbundlepy"];
        assert_eq!(origin.project, "SUSE:SLE-15-SP6:Update");
        assert_eq!(origin.package, "python311");

        let github = config.github().unwrap();
        assert_eq!(github.repo, "org/bundle-tracker");
        assert_eq!(github.issue.labels, vec!["dependencies"]);
    }

    #[test]
    fn test_origins_iterate_in_name_order() {
        let config: WatchConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        let names: Vec<&str> = config.origins.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["saltbundlepy", "saltbundlepy-cython"]);
    }

    #[test]
    fn test_github_section_is_optional() {
        let config: WatchConfig = toml::from_str(
            r#"
            [obs]
            bundle_project = "systemsmanagement:saltbundle"

            [origins]
            "#,
        )
        .unwrap();

        assert!(config.github.is_none());
        assert!(config.github().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = WatchConfig::load("/nonexistent/bundlewatch.toml").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bundlewatch.toml");
        std::fs::write(&path, EXAMPLE_CONFIG).unwrap();

        let config = WatchConfig::load(&path).unwrap();
        assert_eq!(config.origins.len(), 2);
    }
}
