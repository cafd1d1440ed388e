//! Durable store for uploads that failed on both channels
//!
//! Each failed request becomes a triple under a per-content-type directory:
//! the media file, an optional thumbnail, and a JSON sidecar with the full
//! metadata needed to reconstruct the request later. Base names combine a
//! wall-clock timestamp with a random suffix so directory order is
//! chronological and concurrent saves cannot collide.
//!
//! Every operation degrades instead of throwing: `save` and `delete` return
//! `bool` and log on failure, because this store is the last line of defense
//! and its own errors must never take down the publish path.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::models::{ContentType, FailedUploadRecord, PublishRequest};

/// Which content-type directories a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryScope {
    All,
    Only(ContentType),
}

impl RetryScope {
    fn types(&self) -> Vec<ContentType> {
        match self {
            Self::All => ContentType::all().to_vec(),
            Self::Only(ct) => vec![*ct],
        }
    }
}

/// One stored failure, ready to be retried or deleted by base name
#[derive(Debug, Clone)]
pub struct StoredFailure {
    pub content_type: ContentType,
    pub base_name: String,
    pub record: FailedUploadRecord,
}

/// Per-content-type counts for the status surface
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StoreStatistics {
    pub longform: usize,
    pub shorts: usize,
}

impl StoreStatistics {
    pub fn total(&self) -> usize {
        self.longform + self.shorts
    }
}

/// Filesystem-backed failed-upload store
pub struct DurableFailureStore {
    root: PathBuf,
}

impl DurableFailureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding one content type's failure triples
    pub fn type_dir(&self, content_type: ContentType) -> PathBuf {
        self.root.join(content_type.as_str())
    }

    /// Persist a failed request; returns false (after logging) on any error
    ///
    /// Copies the media and thumbnail under a fresh timestamped base name and
    /// writes the JSON sidecar last, so a partially written triple is never
    /// picked up by a listing.
    pub fn save(&self, request: &PublishRequest, reason: &str) -> bool {
        match self.save_inner(request, reason) {
            Ok(base_name) => {
                info!(
                    title = %request.title,
                    content_type = %request.content_type,
                    base_name = %base_name,
                    "Failed upload persisted for retry"
                );
                true
            }
            Err(e) => {
                error!(
                    title = %request.title,
                    error = %e,
                    "Could not persist failed upload"
                );
                false
            }
        }
    }

    fn save_inner(&self, request: &PublishRequest, reason: &str) -> anyhow::Result<String> {
        use anyhow::Context;

        let dir = self.type_dir(request.content_type);
        std::fs::create_dir_all(&dir).context("Failed to create store directory")?;

        let base_name = new_base_name(Utc::now());

        match self.write_triple(request, reason, &dir, &base_name) {
            Ok(()) => Ok(base_name),
            Err(e) => {
                // A half-written triple has no sidecar, so `list` would never
                // surface it and the copies would sit in the directory forever
                remove_partial_triple(&dir, &base_name);
                Err(e)
            }
        }
    }

    fn write_triple(
        &self,
        request: &PublishRequest,
        reason: &str,
        dir: &Path,
        base_name: &str,
    ) -> anyhow::Result<()> {
        use anyhow::Context;

        let media_ext = extension_of(&request.media_path).unwrap_or_else(|| "mp4".to_string());
        let video_file_name = format!("{base_name}.{media_ext}");
        std::fs::copy(&request.media_path, dir.join(&video_file_name))
            .with_context(|| format!("Failed to copy media {}", request.media_path.display()))?;

        let thumbnail_file_name = match &request.thumbnail_path {
            Some(thumb) => {
                let ext = extension_of(thumb).unwrap_or_else(|| "png".to_string());
                let name = format!("{base_name}.{ext}");
                std::fs::copy(thumb, dir.join(&name))
                    .with_context(|| format!("Failed to copy thumbnail {}", thumb.display()))?;
                Some(name)
            }
            None => None,
        };

        let record = FailedUploadRecord {
            title: request.title.clone(),
            description: request.description.clone(),
            tags: request.tags.clone(),
            category_id: request.category_id.clone(),
            privacy: request.privacy,
            video_file_name,
            thumbnail_file_name,
            content_type: request.content_type,
            failed_at: Utc::now(),
            failure_reason: reason.to_string(),
            source_url: request.source_url.clone(),
        };

        let sidecar = dir.join(format!("{base_name}.json"));
        let json = serde_json::to_string_pretty(&record).context("Failed to serialize record")?;
        std::fs::write(&sidecar, json).context("Failed to write record sidecar")?;

        Ok(())
    }

    /// List stored failures in the given scope, oldest first
    ///
    /// Unreadable or corrupt sidecars are skipped with a warning rather than
    /// aborting the listing.
    pub fn list(&self, scope: RetryScope) -> Vec<StoredFailure> {
        let mut failures = Vec::new();

        for content_type in scope.types() {
            let dir = self.type_dir(content_type);
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let base_name = match path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) => stem.to_string(),
                    None => continue,
                };

                match std::fs::read_to_string(&path)
                    .map_err(anyhow::Error::from)
                    .and_then(|raw| Ok(serde_json::from_str::<FailedUploadRecord>(&raw)?))
                {
                    Ok(record) => failures.push(StoredFailure {
                        content_type,
                        base_name,
                        record,
                    }),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable failure record");
                    }
                }
            }
        }

        failures.sort_by(|a, b| {
            a.record
                .failed_at
                .cmp(&b.record.failed_at)
                .then_with(|| a.base_name.cmp(&b.base_name))
        });
        failures
    }

    /// Remove one failure's triple; returns false if the sidecar is missing
    ///
    /// Media and thumbnail removal is best-effort once the sidecar is gone,
    /// since a missing sidecar already makes the triple invisible to `list`.
    pub fn delete(&self, content_type: ContentType, base_name: &str) -> bool {
        let dir = self.type_dir(content_type);
        let sidecar = dir.join(format!("{base_name}.json"));

        let record: Option<FailedUploadRecord> = std::fs::read_to_string(&sidecar)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok());

        if std::fs::remove_file(&sidecar).is_err() {
            warn!(
                content_type = %content_type,
                base_name = %base_name,
                "Failure record sidecar already gone"
            );
            return false;
        }

        if let Some(record) = record {
            let _ = std::fs::remove_file(dir.join(&record.video_file_name));
            if let Some(thumb) = &record.thumbnail_file_name {
                let _ = std::fs::remove_file(dir.join(thumb));
            }
        }

        debug!(content_type = %content_type, base_name = %base_name, "Failure record deleted");
        true
    }

    /// Counts per content type
    pub fn statistics(&self) -> StoreStatistics {
        StoreStatistics {
            longform: self.count_sidecars(ContentType::Longform),
            shorts: self.count_sidecars(ContentType::Shorts),
        }
    }

    fn count_sidecars(&self, content_type: ContentType) -> usize {
        std::fs::read_dir(self.type_dir(content_type))
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("json"))
                    .count()
            })
            .unwrap_or(0)
    }
}

// The random suffix makes the base name unique, so a stem scan only ever
// matches this save's own copies
fn remove_partial_triple(dir: &Path, base_name: &str) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.file_stem().and_then(|s| s.to_str()) == Some(base_name) {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn new_base_name(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{}_{}", now.format("%Y%m%d%H%M%S"), suffix.to_lowercase())
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PrivacyStatus, PublishRequest};
    use tempfile::TempDir;

    fn request_with_media(dir: &Path, name: &str, content_type: ContentType) -> PublishRequest {
        let media = dir.join(name);
        std::fs::write(&media, b"fake video bytes").unwrap();
        let mut request = PublishRequest::new("업로드 실패 영상", media, content_type);
        request.description = "설명문".to_string();
        request.privacy = PrivacyStatus::Public;
        request.source_url = Some("https://news.example.com/a/1".to_string());
        request
    }

    #[test]
    fn test_save_then_list_roundtrip() {
        let work = TempDir::new().unwrap();
        let store = DurableFailureStore::new(work.path().join("failed"));
        let request = request_with_media(work.path(), "clip.mp4", ContentType::Shorts);

        assert!(store.save(&request, "automation step timeout"));

        let listed = store.list(RetryScope::All);
        assert_eq!(listed.len(), 1);
        let stored = &listed[0];
        assert_eq!(stored.content_type, ContentType::Shorts);
        assert_eq!(stored.record.title, "업로드 실패 영상");
        assert_eq!(stored.record.failure_reason, "automation step timeout");
        assert!(stored.record.video_file_name.ends_with(".mp4"));

        // Media copy actually landed next to the sidecar
        let media = store
            .type_dir(ContentType::Shorts)
            .join(&stored.record.video_file_name);
        assert_eq!(std::fs::read(media).unwrap(), b"fake video bytes");
    }

    #[test]
    fn test_thumbnail_is_copied_with_same_base_name() {
        let work = TempDir::new().unwrap();
        let store = DurableFailureStore::new(work.path().join("failed"));
        let mut request = request_with_media(work.path(), "clip.mp4", ContentType::Longform);
        let thumb = work.path().join("thumb.png");
        std::fs::write(&thumb, b"png").unwrap();
        request.thumbnail_path = Some(thumb);

        assert!(store.save(&request, "network error"));

        let stored = &store.list(RetryScope::Only(ContentType::Longform))[0];
        let thumb_name = stored.record.thumbnail_file_name.as_ref().unwrap();
        assert!(thumb_name.starts_with(&stored.base_name));
        assert!(store.type_dir(ContentType::Longform).join(thumb_name).exists());
    }

    #[test]
    fn test_save_returns_false_when_media_missing() {
        let work = TempDir::new().unwrap();
        let store = DurableFailureStore::new(work.path().join("failed"));
        let request =
            PublishRequest::new("없는 파일", work.path().join("missing.mp4"), ContentType::Shorts);

        assert!(!store.save(&request, "whatever"));
        assert!(store.list(RetryScope::All).is_empty());
    }

    #[test]
    fn test_failed_save_leaves_no_partial_files() {
        let work = TempDir::new().unwrap();
        let store = DurableFailureStore::new(work.path().join("failed"));

        // Media copy succeeds, thumbnail copy then fails
        let mut request = request_with_media(work.path(), "clip.mp4", ContentType::Shorts);
        request.thumbnail_path = Some(work.path().join("missing.png"));

        assert!(!store.save(&request, "reason"));

        let leftovers: Vec<_> = std::fs::read_dir(store.type_dir(ContentType::Shorts))
            .unwrap()
            .flatten()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_list_is_oldest_first_and_scoped() {
        let work = TempDir::new().unwrap();
        let store = DurableFailureStore::new(work.path().join("failed"));

        let shorts = request_with_media(work.path(), "a.mp4", ContentType::Shorts);
        let longform = request_with_media(work.path(), "b.mp4", ContentType::Longform);
        assert!(store.save(&shorts, "first"));
        assert!(store.save(&longform, "second"));

        let all = store.list(RetryScope::All);
        assert_eq!(all.len(), 2);
        assert!(all[0].record.failed_at <= all[1].record.failed_at);
        assert_eq!(all[0].record.failure_reason, "first");

        let only_shorts = store.list(RetryScope::Only(ContentType::Shorts));
        assert_eq!(only_shorts.len(), 1);
        assert_eq!(only_shorts[0].content_type, ContentType::Shorts);
    }

    #[test]
    fn test_delete_removes_triple() {
        let work = TempDir::new().unwrap();
        let store = DurableFailureStore::new(work.path().join("failed"));
        let mut request = request_with_media(work.path(), "clip.mp4", ContentType::Shorts);
        let thumb = work.path().join("thumb.png");
        std::fs::write(&thumb, b"png").unwrap();
        request.thumbnail_path = Some(thumb);
        assert!(store.save(&request, "reason"));

        let stored = store.list(RetryScope::All).remove(0);
        assert!(store.delete(stored.content_type, &stored.base_name));

        assert!(store.list(RetryScope::All).is_empty());
        let dir = store.type_dir(ContentType::Shorts);
        assert!(!dir.join(&stored.record.video_file_name).exists());
        let thumb_name = stored.record.thumbnail_file_name.as_ref().unwrap();
        assert!(!dir.join(thumb_name).exists());

        // Second delete finds nothing
        assert!(!store.delete(stored.content_type, &stored.base_name));
    }

    #[test]
    fn test_corrupt_sidecar_is_skipped() {
        let work = TempDir::new().unwrap();
        let store = DurableFailureStore::new(work.path().join("failed"));
        let request = request_with_media(work.path(), "ok.mp4", ContentType::Shorts);
        assert!(store.save(&request, "valid one"));

        let dir = store.type_dir(ContentType::Shorts);
        std::fs::write(dir.join("20200101000000_zzzzzz.json"), "{ not json").unwrap();

        let listed = store.list(RetryScope::All);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].record.failure_reason, "valid one");
    }

    #[test]
    fn test_statistics() {
        let work = TempDir::new().unwrap();
        let store = DurableFailureStore::new(work.path().join("failed"));
        assert_eq!(store.statistics().total(), 0);

        let shorts = request_with_media(work.path(), "a.mp4", ContentType::Shorts);
        assert!(store.save(&shorts, "r1"));
        assert!(store.save(&shorts, "r2"));
        let longform = request_with_media(work.path(), "b.mp4", ContentType::Longform);
        assert!(store.save(&longform, "r3"));

        let stats = store.statistics();
        assert_eq!(stats.shorts, 2);
        assert_eq!(stats.longform, 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_stored_record_rebuilds_request() {
        let work = TempDir::new().unwrap();
        let store = DurableFailureStore::new(work.path().join("failed"));
        let request = request_with_media(work.path(), "clip.mp4", ContentType::Shorts);
        assert!(store.save(&request, "reason"));

        let stored = store.list(RetryScope::All).remove(0);
        let rebuilt = stored.record.to_request(&store.type_dir(stored.content_type));
        assert!(rebuilt.media_path.exists());
        assert_eq!(rebuilt.title, request.title);
        assert_eq!(rebuilt.source_url, request.source_url);
    }
}
