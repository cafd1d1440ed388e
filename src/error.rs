//! Unified error handling for the songchul crate
//!
//! Domain-specific errors (`AutomationError`, `PrimaryError`) stay in their
//! modules; this module wraps them into a single `Error` enum for the outer
//! boundaries (CLI, daemon) together with a classification that drives
//! retry-or-abort decisions.

use std::io;
use thiserror::Error;

pub use crate::publisher::fallback::AutomationError;
pub use crate::publisher::PrimaryError;

/// Common interface for songchul error types
pub trait SongchulErrorTrait: std::error::Error {
    /// Whether retrying the same operation later can plausibly succeed
    fn is_recoverable(&self) -> bool;

    /// Classification used to pick a handling strategy
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network and HTTP transport errors
    Network,
    /// Primary API channel errors, quota signature included
    Primary,
    /// UI-automation channel errors
    Automation,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the songchul crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fallback channel errors
    #[error("Automation error: {0}")]
    Automation(#[from] AutomationError),

    /// Primary channel errors
    #[error("Primary error: {0}")]
    Primary(#[from] PrimaryError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SongchulErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Automation(e) => e.is_transient(),
            // Quota exhaustion clears at the daily reset; other primary
            // failures route to the fallback anyway
            Self::Primary(_) => true,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Http(_) => true,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Automation(_) => ErrorCategory::Automation,
            Self::Primary(_) => ErrorCategory::Primary,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Storage,
            Self::Http(_) => ErrorCategory::Network,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
