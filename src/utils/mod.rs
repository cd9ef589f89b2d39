//! Utilities
//!
//! Common utilities used throughout the application.

pub mod error;
pub mod paths;

pub use error::*;
pub use paths::*;

/// Truncate text to at most `max` characters for logging.
pub fn truncate_for_log(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
