//! Scheduled retry drain for durably stored failures
//!
//! `RetryScheduler::run` walks the failure store oldest-first and replays
//! each request through the fallback channel. Runs never overlap: a trigger
//! arriving while a drain is in progress returns a skipped report without
//! touching the store. The drain is deliberately not ordered against the
//! live publish path; the deduplication index catches the race where both
//! publish the same source.

pub mod recurring;

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::RetryConfig;
use crate::dedup::DeduplicationIndex;
use crate::publisher::FallbackPublisher;
use crate::store::{DurableFailureStore, RetryScope, StoredFailure};
use recurring::RecurringTask;

/// What one drain run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// True when the run was skipped because another drain was in progress
    pub skipped: bool,
}

impl RetryReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }
}

pub struct RetryScheduler {
    store: Arc<DurableFailureStore>,
    fallback: Arc<FallbackPublisher>,
    dedup: Arc<DeduplicationIndex>,
    config: RetryConfig,
    task: RecurringTask,
}

impl RetryScheduler {
    pub fn new(
        store: Arc<DurableFailureStore>,
        fallback: Arc<FallbackPublisher>,
        dedup: Arc<DeduplicationIndex>,
        config: RetryConfig,
    ) -> Self {
        Self {
            store,
            fallback,
            dedup,
            config,
            task: RecurringTask::new("retry_drain"),
        }
    }

    /// Drain stored failures in the given scope, oldest first
    ///
    /// Each record is retried once per run; a failed retry stays in the
    /// store for the next run. There is no attempt cutoff.
    pub async fn run(&self, scope: RetryScope) -> RetryReport {
        let _guard = match self.task.try_begin() {
            Some(guard) => guard,
            None => {
                info!("Retry drain already running, skipping this trigger");
                return RetryReport::skipped();
            }
        };

        let pending = self.store.list(scope);
        if pending.is_empty() {
            return RetryReport::default();
        }

        info!(count = pending.len(), "Retry drain started");
        let mut report = RetryReport::default();
        let total = pending.len();

        for (position, stored) in pending.into_iter().enumerate() {
            report.attempted += 1;
            if self.retry_one(&stored).await {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }

            if position + 1 < total {
                tokio::time::sleep(self.pause()).await;
            }
        }

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            "Retry drain finished"
        );
        report
    }

    async fn retry_one(&self, stored: &StoredFailure) -> bool {
        let dir = self.store.type_dir(stored.content_type);
        let request = stored.record.to_request(&dir);

        info!(
            title = %request.title,
            content_type = %stored.content_type,
            base_name = %stored.base_name,
            "Retrying stored upload"
        );

        match self.fallback.publish(request.clone()).await {
            Ok(video) => {
                if let Some(source_url) = &request.source_url {
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
                        error!(error = %e, "Could not mark retried upload as published");
                    }
                }

                if !self.store.delete(stored.content_type, &stored.base_name) {
                    warn!(
                        base_name = %stored.base_name,
                        "Retried upload succeeded but its record was already gone"
                    );
                }

                info!(title = %request.title, url = %video.video_url, "Stored upload retried successfully");
                true
            }
            Err(failure) => {
                warn!(
                    title = %request.title,
                    step = failure.step.as_str(),
                    error = %failure.error,
                    "Retry attempt failed, record kept for next run"
                );
                false
            }
        }
    }

    // Randomized pause between items so drained uploads do not land in a
    // machine-regular cadence
    fn pause(&self) -> Duration {
        let (lo, hi) = self.config.pause_range_secs;
        if hi <= lo {
            return Duration::from_secs(lo);
        }
        Duration::from_secs(rand::thread_rng().gen_range(lo..=hi))
    }
}
