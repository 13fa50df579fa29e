//! Terminal styling utilities
//!
//! Consistent colors for CLI output. Uses crossterm for cross-platform
//! terminal colors.

use crossterm::style::{StyledContent, Stylize};

/// Section headers (table titles)
pub fn header(text: &str) -> StyledContent<String> {
    text.to_string().bold()
}

/// Dim/muted text (separators, empty-table placeholders)
pub fn dim(text: &str) -> StyledContent<String> {
    text.to_string().dark_grey()
}

/// Success text
pub fn success(text: &str) -> StyledContent<String> {
    text.to_string().green()
}

/// Warning text
pub fn warning(text: &str) -> StyledContent<String> {
    text.to_string().yellow()
}

/// Error text
pub fn error(text: &str) -> StyledContent<String> {
    text.to_string().red()
}
