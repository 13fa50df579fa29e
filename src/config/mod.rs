//! Configuration system
//!
//! Loads the TOML config file declaring the watched origins, the
//! build-service and git-server base URLs, and the GitHub issue settings.
//! Build-service credentials resolve through an explicit ordered provider
//! chain: environment variables first, then an osc-style INI file.

mod credentials;
mod watch_config;

pub use credentials::{CredentialChain, CredentialProvider, ObsCredentials};
pub use watch_config::{
    GithubSection, IssueSection, ObsSection, OriginEntry, WatchConfig, DEFAULT_CONFIG_PATH,
};
