//! Error types for bundlewatch
//!
//! One crate-wide error enum covering all failure modes, plus the variants
//! the CLI maps to dedicated exit codes. Uses thiserror for ergonomic
//! error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bundlewatch operations
pub type Result<T> = std::result::Result<T, BundlewatchError>;

/// Comprehensive error type for bundlewatch operations
#[derive(Error, Debug)]
pub enum BundlewatchError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Build-service credential resolution errors (fatal for the run)
    #[error("Could not obtain build-service credentials: {0}")]
    Credentials(String),

    /// The watermark file already holds a timestamp
    #[error("{path} is already initialized, use --force to override it")]
    WatermarkExists { path: PathBuf },

    /// No GitHub token was supplied for issue creation
    #[error("No GitHub token provided; pass --gh-token or set GHTOKEN")]
    MissingGithubToken,

    /// Git operation errors
    #[error("Git error: {0}")]
    Git(String),

    /// Network/transport errors recovered into per-package failures
    /// elsewhere; fatal only when surfaced directly
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing errors (XML, timestamps)
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config parsing errors
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub integration errors
    #[error("GitHub error: {0}")]
    GitHub(String),

    /// Anyhow errors (for more context)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl BundlewatchError {
    /// Process exit code the CLI uses for this error.
    ///
    /// The codes match the documented CLI contract: 3 for an already
    /// initialized watermark, 4 for a missing GitHub token, 5 for
    /// credential failures or a fatal detection error, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            BundlewatchError::WatermarkExists { .. } => 3,
            BundlewatchError::MissingGithubToken => 4,
            BundlewatchError::Credentials(_) => 5,
            BundlewatchError::Parse(_) => 5,
            _ => 1,
        }
    }
}
