//! Publish orchestrator: the channel-failover chain
//!
//! One entry point routes a request through dedup check, quota gate, primary
//! API, UI-automation fallback, and the durable failure store, in that
//! order. Every path collapses into a `PublishOutcome`; no channel error
//! leaks past this boundary.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::dedup::DeduplicationIndex;
use crate::models::{ChannelUsed, FailureKind, PublishOutcome, PublishRequest, UploadedVideo};
use crate::publisher::fallback::AttemptFailure;
use crate::publisher::{FallbackPublisher, PrimaryChannel};
use crate::quota::QuotaManager;
use crate::store::DurableFailureStore;

pub struct PublishOrchestrator {
    quota: Arc<QuotaManager>,
    dedup: Arc<DeduplicationIndex>,
    store: Arc<DurableFailureStore>,
    primary: Arc<dyn PrimaryChannel>,
    fallback: Arc<FallbackPublisher>,
}

impl PublishOrchestrator {
    pub fn new(
        quota: Arc<QuotaManager>,
        dedup: Arc<DeduplicationIndex>,
        store: Arc<DurableFailureStore>,
        primary: Arc<dyn PrimaryChannel>,
        fallback: Arc<FallbackPublisher>,
    ) -> Self {
        Self {
            quota,
            dedup,
            store,
            primary,
            fallback,
        }
    }

    /// Route one request through the full channel chain
    ///
    /// Order: dedup check, quota gate, primary, fallback, durable save. The
    /// primary channel is skipped entirely while the quota flag is raised.
    pub async fn publish(&self, request: PublishRequest) -> PublishOutcome {
        if let Some(source_url) = &request.source_url {
            // Keyed per content type: a longform request for a source that
            // only delivered shorts so far is new work, not a duplicate
            if self
                .dedup
                .is_content_published(source_url, request.content_type, Some(&request.title))
                .await
            {
                info!(
                    title = %request.title,
                    source_url = %source_url,
                    content_type = %request.content_type,
                    "Already published for this content type, skipping"
                );
                return PublishOutcome::Skipped {
                    reason: format!(
                        "{} already published for source: {source_url}",
                        request.content_type
                    ),
                };
            }
        }

        let mut primary_reason: Option<String> = None;

        if self.quota.is_exceeded().await {
            info!(title = %request.title, "Quota flag raised, going straight to fallback");
        } else {
            match self.primary.upload_video(&request).await {
                Ok(video) => {
                    info!(
                        title = %request.title,
                        video_id = %video.video_id,
                        "Published via primary channel"
                    );
                    self.mark_published(&request, &video).await;
                    return PublishOutcome::Success {
                        channel: ChannelUsed::Primary,
                        video,
                    };
                }
                Err(e) => {
                    if e.is_quota_signature() {
                        self.quota.set_exceeded(Some(&e.to_string())).await;
                    }
                    warn!(
                        title = %request.title,
                        error = %e,
                        "Primary channel failed, falling back to automation"
                    );
                    primary_reason = Some(e.to_string());
                }
            }
        }

        match self.fallback.publish(request.clone()).await {
            Ok(video) => {
                info!(
                    title = %request.title,
                    video_id = %video.video_id,
                    "Published via fallback channel"
                );
                self.mark_published(&request, &video).await;
                PublishOutcome::Success {
                    channel: ChannelUsed::Fallback,
                    video,
                }
            }
            Err(failure) => self.handle_total_failure(&request, primary_reason, failure),
        }
    }

    // Both channels failed: persist for the retry drain, or report the
    // persistence failure itself
    fn handle_total_failure(
        &self,
        request: &PublishRequest,
        primary_reason: Option<String>,
        failure: AttemptFailure,
    ) -> PublishOutcome {
        let reason = match primary_reason {
            Some(primary) => format!(
                "primary: {primary}; fallback at {}: {}",
                failure.step.as_str(),
                failure.error
            ),
            None => format!("fallback at {}: {}", failure.step.as_str(), failure.error),
        };

        error!(title = %request.title, reason = %reason, "All publish channels failed");

        if self.store.save(request, &reason) {
            PublishOutcome::PendingRetry { reason }
        } else {
            PublishOutcome::FailedHard {
                kind: FailureKind::Persistence,
                reason: format!("{reason}; and the failure could not be persisted"),
            }
        }
    }

    // Dedup bookkeeping for scraped sources; index errors never fail a
    // publish that already happened
    async fn mark_published(&self, request: &PublishRequest, video: &UploadedVideo) {
        let Some(source_url) = &request.source_url else {
            return;
        };

        if let Err(e) = self
            .dedup
            .mark_as_published(
                source_url,
                &request.title,
                request.content_type,
                &video.video_id,
                &video.video_url,
            )
            .await
        {
            error!(
                source_url = %source_url,
                error = %e,
                "Could not record publish in the deduplication index"
            );
        }
    }
}
