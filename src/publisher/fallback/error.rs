//! Error types for the UI-automation fallback channel

use thiserror::Error;

/// Errors raised while driving the interactive publish surface
#[derive(Error, Debug)]
pub enum AutomationError {
    /// Session could not be acquired from the driver
    #[error("session initialization failed: {0}")]
    SessionInit(String),

    /// A driver command failed (network, protocol, element gone)
    #[error("driver command failed: {0}")]
    Driver(String),

    /// Every candidate locator for a control was tried and none matched
    #[error("no candidate locator matched for {control}")]
    LocatorExhausted { control: &'static str },

    /// A step exceeded its own bounded wait
    #[error("step timed out after {timeout_secs}s")]
    StepTimeout { timeout_secs: u64 },

    /// The bounded wait for an external/manual login expired
    #[error("manual login was not completed in time")]
    LoginTimeout,

    /// The success indicator exposed a URL with no recognizable video id
    #[error("published URL has no recognizable video id: {url}")]
    UrlParse { url: String },

    /// The surface reached a state the state machine does not model
    #[error("unexpected automation state: {0}")]
    Unexpected(String),
}

impl AutomationError {
    /// Whether a later attempt is presumed able to succeed
    ///
    /// Locator misses and timeouts are treated as transient (UI drift and
    /// slow loads recover across attempts); only a state the machine does
    /// not model at all is unrecoverable.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Unexpected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AutomationError::LocatorExhausted { control: "next" }.is_transient());
        assert!(AutomationError::StepTimeout { timeout_secs: 30 }.is_transient());
        assert!(AutomationError::LoginTimeout.is_transient());
        assert!(!AutomationError::Unexpected("modal".to_string()).is_transient());
    }

    #[test]
    fn test_display() {
        let err = AutomationError::LocatorExhausted { control: "publish" };
        assert!(err.to_string().contains("publish"));
    }
}
