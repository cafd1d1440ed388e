// Core data structures for the songchul publishing core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Delivery format of a published video
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Standard long-form upload
    Longform,
    /// Short vertical clip
    Shorts,
}

impl ContentType {
    /// Get string representation (also used as the on-disk directory name)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Longform => "longform",
            Self::Shorts => "shorts",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "longform" | "long" => Some(Self::Longform),
            "shorts" | "short" => Some(Self::Shorts),
            _ => None,
        }
    }

    /// All known content types, in retry-drain order
    pub fn all() -> [ContentType; 2] {
        [Self::Longform, Self::Shorts]
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested visibility of a published video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Public,
    Unlisted,
    Private,
}

impl PrivacyStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Some(Self::Public),
            "unlisted" => Some(Self::Unlisted),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully formed publish request produced by the upstream media pipeline
///
/// Fields are already length-capped and validated upstream; this core only
/// routes the request through the delivery channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: PrivacyStatus,
    pub media_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
    pub content_type: ContentType,
    /// Source article URL, when the video was derived from scraped content
    pub source_url: Option<String>,
}

impl PublishRequest {
    /// Create a minimal request with required fields only
    pub fn new(title: &str, media_path: impl Into<PathBuf>, content_type: ContentType) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            tags: Vec::new(),
            category_id: "25".to_string(), // News & Politics
            privacy: PrivacyStatus::Public,
            media_path: media_path.into(),
            thumbnail_path: None,
            content_type,
            source_url: None,
        }
    }

    /// Media file name without directory components
    pub fn media_file_name(&self) -> Option<String> {
        self.media_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// A successfully uploaded video as reported by either channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedVideo {
    /// Platform content identifier
    pub video_id: String,
    /// Shareable watch URL
    pub video_url: String,
}

/// Which delivery channel produced a successful publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelUsed {
    /// Quota-limited programmatic API
    Primary,
    /// UI-automation fallback
    Fallback,
}

impl std::fmt::Display for ChannelUsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Failure classification surfaced by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Primary channel unusable until the scheduled quota reset
    QuotaExhausted,
    /// Single attempt failed (network, locator, timeout); presumed retryable
    Transient,
    /// Durable store read/write failed
    Persistence,
    /// Automation reached an unexpected state with no remaining locator
    Unrecoverable,
}

/// Result of routing one publish request through the channels
///
/// This is the only shape that crosses the orchestrator boundary; no raw
/// channel error ever propagates past it.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Published successfully on the given channel
    Success {
        channel: ChannelUsed,
        video: UploadedVideo,
    },
    /// Source was already published; nothing was attempted
    Skipped { reason: String },
    /// Both channels failed; the request was persisted for a later retry run
    PendingRetry { reason: String },
    /// Both channels failed and the request could not be persisted
    FailedHard { kind: FailureKind, reason: String },
}

impl PublishOutcome {
    /// Whether the request ended up published
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Channel used, when successful
    pub fn channel(&self) -> Option<ChannelUsed> {
        match self {
            Self::Success { channel, .. } => Some(*channel),
            _ => None,
        }
    }

    /// Notification payload fields exposed at the outer boundary
    pub fn summary(&self, request: &PublishRequest) -> OutcomeSummary {
        let (url, channel) = match self {
            Self::Success { channel, video } => (Some(video.video_url.clone()), Some(*channel)),
            _ => (None, None),
        };

        OutcomeSummary {
            title: request.title.clone(),
            url,
            content_type: request.content_type,
            channel_used: channel,
        }
    }
}

/// Flat success/failure summary handed to the notification boundary
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub title: String,
    pub url: Option<String>,
    pub content_type: ContentType,
    pub channel_used: Option<ChannelUsed>,
}

/// Metadata sidecar persisted next to a failed upload's media files
///
/// Created only when both channels fail; deleted together with the media on
/// a successful retry. File names are relative to the record's directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedUploadRecord {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: PrivacyStatus,
    pub video_file_name: String,
    pub thumbnail_file_name: Option<String>,
    pub content_type: ContentType,
    pub failed_at: DateTime<Utc>,
    pub failure_reason: String,
    pub source_url: Option<String>,
}

impl FailedUploadRecord {
    /// Rebuild a publish request rooted at the given store directory
    pub fn to_request(&self, dir: &std::path::Path) -> PublishRequest {
        PublishRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            category_id: self.category_id.clone(),
            privacy: self.privacy,
            media_path: dir.join(&self.video_file_name),
            thumbnail_path: self.thumbnail_file_name.as_ref().map(|n| dir.join(n)),
            content_type: self.content_type,
            source_url: self.source_url.clone(),
        }
    }
}
