//! Automation session abstraction for the interactive publish surface
//!
//! The fallback channel never talks to a concrete browser directly. Every
//! step is expressed as locate-and-act operations against the
//! [`AutomationSession`] trait, so the state machine tolerates driver
//! replacement the same way the parser tolerates selector drift.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::AutomationError;

// ============================================================================
// Locators
// ============================================================================

/// How a locator value should be interpreted by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorStrategy {
    Css,
    XPath,
    Text,
}

/// One candidate way of finding a control on the surface
///
/// Controls are always described by an ordered list of candidates; the first
/// match wins. This tolerates minor UI and localization drift without a
/// redesign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl Locator {
    /// CSS selector candidate
    pub fn css(value: &str) -> Self {
        Self {
            strategy: LocatorStrategy::Css,
            value: value.to_string(),
        }
    }

    /// XPath candidate
    pub fn xpath(value: &str) -> Self {
        Self {
            strategy: LocatorStrategy::XPath,
            value: value.to_string(),
        }
    }

    /// Visible-text candidate (localization-sensitive, listed last)
    pub fn text(value: &str) -> Self {
        Self {
            strategy: LocatorStrategy::Text,
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.strategy {
            LocatorStrategy::Css => write!(f, "css:{}", self.value),
            LocatorStrategy::XPath => write!(f, "xpath:{}", self.value),
            LocatorStrategy::Text => write!(f, "text:{}", self.value),
        }
    }
}

// ============================================================================
// Session traits
// ============================================================================

/// One live automated session against the publish surface
///
/// Exclusively owned by the fallback worker for the duration of a single
/// attempt and torn down unconditionally afterwards.
#[async_trait]
pub trait AutomationSession: Send {
    /// Navigate the session to a URL
    async fn navigate(&mut self, url: &str) -> Result<(), AutomationError>;

    /// Check whether a control currently exists
    async fn exists(&mut self, locator: &Locator) -> Result<bool, AutomationError>;

    /// Click a control
    async fn click(&mut self, locator: &Locator) -> Result<(), AutomationError>;

    /// Clear the existing content of an input control
    async fn clear(&mut self, locator: &Locator) -> Result<(), AutomationError>;

    /// Send raw keystrokes to an input control
    async fn send_keys(&mut self, locator: &Locator, text: &str) -> Result<(), AutomationError>;

    /// Send a single backspace to an input control
    async fn press_backspace(&mut self, locator: &Locator) -> Result<(), AutomationError>;

    /// Attach a local file to a file-input control
    async fn set_file(&mut self, locator: &Locator, path: &Path) -> Result<(), AutomationError>;

    /// Read an attribute (e.g. `href`) from a control, if present
    async fn read_attribute(
        &mut self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, AutomationError>;

    /// Export restorable authenticated-session state
    async fn export_state(&mut self) -> Result<SessionSnapshot, AutomationError>;

    /// Dispose the session; must never fail outward
    async fn dispose(&mut self);
}

/// Acquires fresh sessions, optionally restoring saved state
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(
        &self,
        snapshot: Option<&SessionSnapshot>,
    ) -> Result<Box<dyn AutomationSession>, AutomationError>;
}

/// Try candidates in order; return the first that exists
///
/// This is the single reusable locate primitive every step goes through.
pub async fn first_match<'a>(
    session: &mut (dyn AutomationSession + '_),
    candidates: &'a [Locator],
) -> Result<Option<&'a Locator>, AutomationError> {
    for locator in candidates {
        if session.exists(locator).await? {
            return Ok(Some(locator));
        }
    }
    Ok(None)
}

// ============================================================================
// Session snapshot persistence
// ============================================================================

/// Opaque driver-defined authenticated-session state
///
/// Restoring a snapshot lets a fresh session skip the manual login step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: serde_json::Value,
    pub saved_at: chrono::DateTime<chrono::Utc>,
}

impl SessionSnapshot {
    /// Wrap driver state captured just now
    pub fn new(state: serde_json::Value) -> Self {
        Self {
            state,
            saved_at: chrono::Utc::now(),
        }
    }
}

/// Disk-backed store for the single reusable session snapshot
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the saved snapshot, if one exists and parses
    ///
    /// A corrupt snapshot is treated as absent: the attempt proceeds
    /// unauthenticated and waits for a manual login instead.
    pub fn load(&self) -> Option<SessionSnapshot> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return None,
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Saved session snapshot is corrupt, ignoring"
                );
                None
            }
        }
    }

    /// Persist a snapshot atomically (write temp, then rename)
    pub fn save(&self, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create snapshot directory")?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let json =
            serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
        std::fs::write(&temp_path, json).context("Failed to write snapshot temp file")?;
        std::fs::rename(&temp_path, &self.path).context("Failed to rename snapshot file")?;

        tracing::debug!(path = %self.path.display(), "Session snapshot saved");
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
