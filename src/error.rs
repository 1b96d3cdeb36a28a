//! Unified error handling for the audit engine.
//!
//! Ordinary network failures never surface here: the fetcher records them
//! in a [`FetchResult`](crate::models::FetchResult) and the audit carries on.
//! The one exception is a terminal timeout in strict mode, which becomes
//! [`AuditError::Timeout`].

use std::fmt;

use thiserror::Error;

/// Result type alias for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Homepage fetch timed out and the caller asked for strict handling
    #[error("fetch of {url} timed out (status: {}): {detail}", display_status(.status))]
    Timeout {
        url: String,
        status: Option<u16>,
        detail: String,
    },

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Headless browser rendering failed
    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuditError {
    /// Create a strict-mode timeout error.
    pub fn timeout(url: impl Into<String>, status: Option<u16>, detail: impl fmt::Display) -> Self {
        Self::Timeout {
            url: url.into(),
            status,
            detail: detail.to_string(),
        }
    }

    /// Create a render error with context.
    pub fn render(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Render {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// `true` for the strict-mode timeout, the only error a default audit
    /// can return besides setup failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}
