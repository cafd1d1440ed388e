//! Deduplication index guaranteeing idempotent delivery
//!
//! Records which source items already produced published output, keyed by
//! exact source URL with a normalized-title fallback that catches re-scraped
//! duplicates surfacing under a different URL. The index — not mutual
//! exclusion — is the safety net against double publication when the live
//! path and the retry drain race on the same source.
//!
//! The whole index persists as a single atomic snapshot overwrite. A load
//! failure at startup resets to an empty index: availability wins over
//! strict duplicate prevention when storage is corrupt.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::LazyLock;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::ContentType;

// Leading bracketed tags like [속보], [단독], 【영상】
static BRACKET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\[[^\]]*\]\s*|【[^】]*】\s*)+").unwrap());

/// Normalize a title for collision detection
///
/// Strips leading bracketed tags, drops every non-alphanumeric character
/// (Hangul and other scripts count as alphanumeric), and lowercases.
pub fn normalize_title(title: &str) -> String {
    let stripped = BRACKET_PREFIX.replace(title, "");
    stripped
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Per-channel publish result within a record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub video_id: String,
    pub video_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// One published source item and its per-content-type outcomes
///
/// Exactly one record exists per distinct source URL; a later success for a
/// second content type merges into the same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedRecord {
    pub source_url: String,
    pub normalized_title: String,
    pub published_at: DateTime<Utc>,
    pub outcomes: BTreeMap<ContentType, ChannelOutcome>,
}

#[derive(Default)]
struct IndexState {
    records: HashMap<String, PublishedRecord>,
    titles: HashSet<String>,
}

impl IndexState {
    fn from_records(records: Vec<PublishedRecord>) -> Self {
        let mut state = Self::default();
        for record in records {
            state.titles.insert(record.normalized_title.clone());
            state.records.insert(record.source_url.clone(), record);
        }
        state
    }
}

/// File-backed published-source index
pub struct DeduplicationIndex {
    path: PathBuf,
    inner: RwLock<IndexState>,
}

impl DeduplicationIndex {
    /// Load the index; a missing file starts empty, a corrupt file resets to
    /// empty with a warning
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = Self::load(&path);
        Self {
            path,
            inner: RwLock::new(state),
        }
    }

    fn load(path: &std::path::Path) -> IndexState {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return IndexState::default(),
        };

        match serde_json::from_str::<Vec<PublishedRecord>>(&raw) {
            Ok(records) => {
                debug!(path = %path.display(), count = records.len(), "Published index loaded");
                IndexState::from_records(records)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Published index is corrupt, resetting to empty"
                );
                IndexState::default()
            }
        }
    }

    /// Check whether a source item was already published
    ///
    /// Exact URL lookup first; if absent and a title is supplied, falls back
    /// to the normalized-title set.
    pub async fn is_already_published(&self, source_url: &str, title: Option<&str>) -> bool {
        let state = self.inner.read().await;

        if state.records.contains_key(source_url) {
            return true;
        }

        if let Some(title) = title {
            let normalized = normalize_title(title);
            if !normalized.is_empty() && state.titles.contains(&normalized) {
                return true;
            }
        }

        false
    }

    /// Check whether this content type was already delivered for a source
    ///
    /// A known URL counts as a duplicate only when its record already holds
    /// an outcome for `content_type`; a second content type for the same
    /// source is new work. Unknown URLs fall back to the normalized-title
    /// set, so a re-scraped story under a fresh URL is still refused.
    pub async fn is_content_published(
        &self,
        source_url: &str,
        content_type: ContentType,
        title: Option<&str>,
    ) -> bool {
        let state = self.inner.read().await;

        if let Some(record) = state.records.get(source_url) {
            return record.outcomes.contains_key(&content_type);
        }

        if let Some(title) = title {
            let normalized = normalize_title(title);
            if !normalized.is_empty() && state.titles.contains(&normalized) {
                return true;
            }
        }

        false
    }

    /// Record a publish success; creates or merges the per-content-type
    /// sub-result and persists the full index atomically
    pub async fn mark_as_published(
        &self,
        source_url: &str,
        title: &str,
        content_type: ContentType,
        video_id: &str,
        video_url: &str,
    ) -> anyhow::Result<()> {
        let mut state = self.inner.write().await;
        let now = Utc::now();

        let outcome = ChannelOutcome {
            video_id: video_id.to_string(),
            video_url: video_url.to_string(),
            uploaded_at: now,
        };

        let normalized = normalize_title(title);
        state.titles.insert(normalized.clone());

        match state.records.get_mut(source_url) {
            Some(record) => {
                record.outcomes.insert(content_type, outcome);
            }
            None => {
                let mut outcomes = BTreeMap::new();
                outcomes.insert(content_type, outcome);
                state.records.insert(
                    source_url.to_string(),
                    PublishedRecord {
                        source_url: source_url.to_string(),
                        normalized_title: normalized,
                        published_at: now,
                        outcomes,
                    },
                );
            }
        }

        debug!(source_url = %source_url, content_type = %content_type, "Marked as published");
        self.persist(&state)
    }

    /// All records, oldest first
    pub async fn get_all(&self) -> Vec<PublishedRecord> {
        let state = self.inner.read().await;
        let mut records: Vec<_> = state.records.values().cloned().collect();
        records.sort_by_key(|r| r.published_at);
        records
    }

    /// Number of distinct published sources
    pub async fn count(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Drop records older than the given number of days; returns how many
    /// were removed
    pub async fn remove_older_than(&self, days: i64) -> anyhow::Result<usize> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut state = self.inner.write().await;

        let before = state.records.len();
        state.records.retain(|_, record| record.published_at >= cutoff);
        let removed = before - state.records.len();

        if removed > 0 {
            // Titles are only removable by rebuilding from what remains
            state.titles = state
                .records
                .values()
                .map(|r| r.normalized_title.clone())
                .collect();

            info!(removed, days, "Pruned old published records");
            self.persist(&state)?;
        }

        Ok(removed)
    }

    // Atomic snapshot overwrite: write temp, then rename
    fn persist(&self, state: &IndexState) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create index directory")?;
        }

        let mut records: Vec<_> = state.records.values().cloned().collect();
        records.sort_by_key(|r| r.published_at);

        let temp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&records).context("Failed to serialize index")?;
        std::fs::write(&temp_path, json).context("Failed to write index temp file")?;
        std::fs::rename(&temp_path, &self.path).context("Failed to rename index file")?;

        Ok(())
    }
}
