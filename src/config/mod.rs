//! Configuration management for the songchul publishing core
//!
//! This module handles loading and validating configuration from environment
//! variables (prefix `SONGCHUL_`) and TOML files.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::publisher::fallback::typing::TypingProfile;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Durable state layout
    pub storage: StorageConfig,

    /// Primary (programmatic API) channel configuration
    pub primary: PrimaryConfig,

    /// Fallback (UI automation) channel configuration
    pub automation: AutomationConfig,

    /// Retry drain configuration
    pub retry: RetryConfig,

    /// Scheduled quota reset configuration
    pub quota_reset: QuotaResetConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Durable state layout under a single data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for all persisted state
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl StorageConfig {
    /// Singleton quota flag file
    pub fn quota_path(&self) -> PathBuf {
        self.data_dir.join("quota.json")
    }

    /// Published-index snapshot file
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("published_index.json")
    }

    /// Root of the per-content-type failed-upload directories
    pub fn failed_dir(&self) -> PathBuf {
        self.data_dir.join("failed")
    }

    /// Reusable saved-authentication-session snapshot
    pub fn session_snapshot_path(&self) -> PathBuf {
        self.data_dir.join("session_snapshot.json")
    }
}

/// Primary channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    /// Upload endpoint of the platform API
    pub endpoint: String,

    /// Bearer token; unset means unauthenticated (useful against stubs)
    pub api_token: Option<String>,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/upload/youtube/v3/videos".to_string(),
            api_token: None,
            request_timeout_secs: 600,
        }
    }
}

impl PrimaryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Fallback channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Automation bridge (driver) endpoint
    pub bridge_url: String,

    /// Publish surface entry URL
    pub studio_url: String,

    /// Session acquisition bound in seconds
    pub session_init_timeout_secs: u64,

    /// Authenticated-state detection bound in seconds
    pub auth_check_timeout_secs: u64,

    /// Bounded long wait for an external/manual login, in seconds
    pub login_wait_timeout_secs: u64,

    /// Settle interval range after attaching media, in milliseconds
    pub settle_delay_ms: (u64, u64),

    /// Randomized delay range between dialog steps, in milliseconds
    pub step_delay_ms: (u64, u64),

    /// Bound for each ordinary dialog step, in seconds
    pub step_timeout_secs: u64,

    /// Bound for the terminal publish/processing wait, in seconds
    ///
    /// Materially longer than step_timeout_secs: the platform transcodes
    /// before exposing the share URL.
    pub publish_timeout_secs: u64,

    /// Humanized typing distribution
    pub typing: TypingProfile,

    /// Attach an end-of-video template for long-form uploads
    pub longform_end_template: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            bridge_url: "http://127.0.0.1:9515".to_string(),
            studio_url: "https://studio.youtube.com".to_string(),
            session_init_timeout_secs: 60,
            auth_check_timeout_secs: 30,
            login_wait_timeout_secs: 900,
            settle_delay_ms: (2_000, 5_000),
            step_delay_ms: (800, 2_500),
            step_timeout_secs: 60,
            publish_timeout_secs: 600,
            typing: TypingProfile::default(),
            longform_end_template: true,
        }
    }
}

impl AutomationConfig {
    /// Config with every wait zeroed, for tests
    pub fn instant() -> Self {
        Self {
            settle_delay_ms: (0, 1),
            step_delay_ms: (0, 1),
            typing: TypingProfile::instant(),
            ..Self::default()
        }
    }
}

/// Retry drain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Randomized pause range between retried items, in seconds
    pub pause_range_secs: (u64, u64),

    /// Daemon cadence between retry runs, in minutes
    pub interval_minutes: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            pause_range_secs: (30, 180),
            interval_minutes: 60,
        }
    }
}

/// Scheduled quota reset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaResetConfig {
    /// Local wall-clock boundary at which the platform refreshes quota (HH:MM)
    pub reset_time: String,
}

impl Default for QuotaResetConfig {
    fn default() -> Self {
        Self {
            // Midnight Pacific, expressed in KST
            reset_time: "17:00".to_string(),
        }
    }
}

impl QuotaResetConfig {
    /// Parse the reset boundary
    pub fn parse_reset_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.reset_time, "%H:%M").with_context(|| {
            format!(
                "Invalid quota reset time '{}'. Expected HH:MM",
                self.reset_time
            )
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(dir) = std::env::var("SONGCHUL_DATA_DIR") {
            config.storage.data_dir = dir.into();
        }

        if let Ok(endpoint) = std::env::var("SONGCHUL_PRIMARY_ENDPOINT") {
            config.primary.endpoint = endpoint;
        }
        config.primary.api_token = std::env::var("SONGCHUL_API_TOKEN").ok();
        if let Some(secs) = env_parse::<u64>("SONGCHUL_PRIMARY_TIMEOUT") {
            config.primary.request_timeout_secs = secs;
        }

        if let Ok(url) = std::env::var("SONGCHUL_BRIDGE_URL") {
            config.automation.bridge_url = url;
        }
        if let Ok(url) = std::env::var("SONGCHUL_STUDIO_URL") {
            config.automation.studio_url = url;
        }
        if let Some(secs) = env_parse::<u64>("SONGCHUL_LOGIN_WAIT_TIMEOUT") {
            config.automation.login_wait_timeout_secs = secs;
        }

        if let Some(minutes) = env_parse::<u64>("SONGCHUL_RETRY_INTERVAL") {
            config.retry.interval_minutes = minutes;
        }

        if let Ok(time) = std::env::var("SONGCHUL_QUOTA_RESET_TIME") {
            config.quota_reset.reset_time = time;
        }

        if let Ok(level) = std::env::var("SONGCHUL_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.quota_reset.parse_reset_time()?;

        if self.primary.endpoint.is_empty() {
            anyhow::bail!("primary.endpoint cannot be empty");
        }

        if self.automation.publish_timeout_secs <= self.automation.step_timeout_secs {
            anyhow::bail!("automation.publish_timeout_secs must exceed step_timeout_secs");
        }

        let (lo, hi) = self.retry.pause_range_secs;
        if lo > hi {
            anyhow::bail!("retry.pause_range_secs must be (min, max) with min <= max");
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
