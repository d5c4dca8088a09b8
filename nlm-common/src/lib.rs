//! Common types and utilities shared across the `nlm` crates.
//!
//! This crate defines the shared error type, the output format enum used by the
//! formatter and the CLI, and the observability helpers. It is intentionally
//! lightweight so that every crate can depend on it without pulling in the HTTP
//! stack.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`NlmError`] and [`Result`]: Shared error handling
//! - [`OutputFormat`]: Rendering target for interactive content
//!
//! # Examples
//!
//! ```rust
//! use nlm_common::OutputFormat;
//!
//! let fmt: OutputFormat = "markdown".parse().unwrap();
//! assert_eq!(fmt, OutputFormat::Markdown);
//! assert_eq!(fmt.extension(), "md");
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod observability;

/// Rendering target for exported interactive content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The page HTML, returned untouched.
    Html,
    #[default]
    Markdown,
    Json,
}

impl OutputFormat {
    /// File extension conventionally used for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
        };
        f.write_str(s)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "unknown output format '{other}' (expected html, markdown or json)"
            )),
        }
    }
}

/// Error types used across the `nlm` workspace.
#[derive(thiserror::Error, Debug)]
pub enum NlmError {
    /// Artifact lookup or payload extraction failed.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The transport reported an error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The auth profile could not be read or is unusable.
    #[error("Profile error: {0}")]
    Profile(String),

    /// The browser session belongs to a different account than the stored profile.
    #[error(
        "Account mismatch for profile '{profile_name}': stored account is {stored_email}, \
         but the current session belongs to {new_email}"
    )]
    AccountMismatch {
        stored_email: String,
        new_email: String,
        profile_name: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NlmError {
    /// Short remediation hint suitable for printing under the error message.
    pub fn hint(&self) -> Option<String> {
        match self {
            NlmError::AccountMismatch { profile_name, .. } => Some(format!(
                "Sign in with the stored account, or re-run with --force to overwrite profile '{profile_name}'."
            )),
            NlmError::Profile(_) => {
                Some("Refresh the profile by exporting cookies from a signed-in browser.".into())
            }
            _ => None,
        }
    }
}

/// Convenient alias for results that use [`NlmError`].
pub type Result<T> = std::result::Result<T, NlmError>;
