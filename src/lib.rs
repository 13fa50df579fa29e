//! Bundlewatch - Origin package update watcher
//!
//! Bundlewatch polls a build-service API for a curated set of "origin"
//! packages and reports which ones changed since the last recorded run,
//! optionally filing a GitHub tracking issue with the result. Origins that
//! live in git-managed projects are checked against the git server instead
//! of the build-service API.
//!
//! # Architecture
//!
//! - **config**: TOML configuration and build-service credential resolution
//! - **obs**: build-service XML API client with a per-run response cache
//! - **git**: shallow-clone probe for git-managed packages
//! - **detect**: the detection pass over all configured origins
//! - **report**: aggregate report, Markdown tables, issue-body templates
//! - **github**: GitHub issue creation and project-board assignment
//! - **timestamp**: the plain-text watermark file

// Core modules
pub mod config;
pub mod detect;
pub mod error;
pub mod git;
pub mod obs;
pub mod report;
pub mod timestamp;

// Components
pub mod github;
pub mod logging;
pub mod style;

// Re-exports
pub use error::{BundlewatchError, Result};

/// Unix timestamp in seconds, as stored in the watermark file and parsed
/// from build-service entry metadata.
pub type Timestamp = i64;
