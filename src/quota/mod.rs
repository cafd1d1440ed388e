//! Primary-channel quota tracking
//!
//! A singleton persisted flag records whether the programmatic API's usage
//! allowance is depleted. The flag only ever moves false→true on a
//! quota-exhaustion signal and true→false on a scheduled or manual reset —
//! an unrelated success never clears it.
//!
//! Storage I/O failures are logged and swallowed: the manager degrades to
//! in-memory-only state rather than failing startup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Persisted singleton quota state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaFlag {
    pub exceeded: bool,
    pub last_updated: DateTime<Utc>,
}

impl Default for QuotaFlag {
    fn default() -> Self {
        Self {
            exceeded: false,
            last_updated: Utc::now(),
        }
    }
}

/// Tracks and persists primary-channel exhaustion
pub struct QuotaManager {
    path: PathBuf,
    state: RwLock<QuotaFlag>,
}

impl QuotaManager {
    /// Load state from durable storage; missing or corrupt storage defaults
    /// to `exceeded = false`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = Self::load(&path);
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    fn load(path: &std::path::Path) -> QuotaFlag {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(flag) => {
                    debug!(path = %path.display(), "Quota flag loaded");
                    flag
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Quota flag file is corrupt, defaulting to not-exceeded"
                    );
                    QuotaFlag::default()
                }
            },
            Err(_) => QuotaFlag::default(),
        }
    }

    /// Pure read of the current flag
    pub async fn is_exceeded(&self) -> bool {
        self.state.read().await.exceeded
    }

    /// When the flag last changed
    pub async fn last_updated(&self) -> DateTime<Utc> {
        self.state.read().await.last_updated
    }

    /// Mark the primary channel exhausted
    ///
    /// Idempotent: a repeat call while already exceeded neither persists nor
    /// logs a transition.
    pub async fn set_exceeded(&self, reason: Option<&str>) {
        let mut state = self.state.write().await;
        if state.exceeded {
            return;
        }

        state.exceeded = true;
        state.last_updated = Utc::now();

        warn!(
            reason = reason.unwrap_or("unspecified"),
            "Primary channel quota exhausted; routing to fallback until reset"
        );

        self.persist(&state);
    }

    /// Clear the flag (scheduled daily or manual)
    ///
    /// Idempotent like `set_exceeded`.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        if !state.exceeded {
            return;
        }

        state.exceeded = false;
        state.last_updated = Utc::now();

        info!("Quota flag reset; primary channel available again");

        self.persist(&state);
    }

    // Best-effort atomic persist; failure degrades to in-memory-only state
    fn persist(&self, flag: &QuotaFlag) {
        let result: anyhow::Result<()> = (|| {
            use anyhow::Context;

            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent).context("Failed to create quota directory")?;
            }

            let temp_path = self.path.with_extension("json.tmp");
            let json = serde_json::to_string_pretty(flag).context("Failed to serialize quota flag")?;
            std::fs::write(&temp_path, json).context("Failed to write quota temp file")?;
            std::fs::rename(&temp_path, &self.path).context("Failed to rename quota file")?;
            Ok(())
        })();

        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to persist quota flag");
        }
    }
}
