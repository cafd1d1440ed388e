//! UI-automation fallback channel
//!
//! The underlying automated session is a singleton stateful resource that
//! cannot host two concurrent flows, so this channel is **single-flight**:
//! submissions enter a FIFO job queue drained by one worker task, and each
//! caller resolves only when its own attempt completes. Every attempt gets a
//! fresh session and unconditionally tears it down, trading startup cost for
//! attempt isolation.

pub mod attempt;
pub mod bridge;
pub mod error;
pub mod selectors;
pub mod session;
pub mod typing;
pub mod url;

pub use attempt::{AttemptFailure, AttemptResult, AttemptStep};
pub use bridge::BridgeSessionFactory;
pub use error::AutomationError;
pub use selectors::SurfaceSelectors;
pub use session::{
    AutomationSession, Locator, LocatorStrategy, SessionFactory, SessionSnapshot, SnapshotStore,
};

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::config::AutomationConfig;
use crate::models::PublishRequest;
use attempt::UploadAttempt;

/// One queued publish job with its deferred completion
struct Job {
    request: PublishRequest,
    done: oneshot::Sender<AttemptResult>,
}

/// Serialized entry point to the UI-automation channel
///
/// Cheap to clone-share behind an `Arc`; all submissions funnel into the
/// same worker queue.
pub struct FallbackPublisher {
    sender: mpsc::UnboundedSender<Job>,
}

impl FallbackPublisher {
    /// Spawn the worker and return the queue handle
    ///
    /// Must be called within a tokio runtime.
    pub fn new(
        config: AutomationConfig,
        snapshot_path: impl Into<PathBuf>,
        factory: Arc<dyn SessionFactory>,
    ) -> Self {
        Self::with_selectors(config, snapshot_path, factory, SurfaceSelectors::default())
    }

    /// Spawn with custom surface selectors
    pub fn with_selectors(
        config: AutomationConfig,
        snapshot_path: impl Into<PathBuf>,
        factory: Arc<dyn SessionFactory>,
        selectors: SurfaceSelectors,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let snapshots = SnapshotStore::new(snapshot_path);

        tokio::spawn(worker_loop(config, selectors, snapshots, factory, receiver));

        Self { sender }
    }

    /// Submit a request; resolves when this job's own attempt completes
    ///
    /// Jobs complete in strict arrival order; no two attempts ever overlap.
    pub async fn publish(&self, request: PublishRequest) -> AttemptResult {
        let (done, wait) = oneshot::channel();

        if self.sender.send(Job { request, done }).is_err() {
            return Err(worker_gone());
        }

        match wait.await {
            Ok(result) => result,
            Err(_) => Err(worker_gone()),
        }
    }
}

fn worker_gone() -> AttemptFailure {
    AttemptFailure {
        step: AttemptStep::SessionInit,
        error: AutomationError::Unexpected("fallback worker is no longer running".to_string()),
    }
}

/// Single worker draining the job queue in FIFO order
async fn worker_loop(
    config: AutomationConfig,
    selectors: SurfaceSelectors,
    snapshots: SnapshotStore,
    factory: Arc<dyn SessionFactory>,
    mut receiver: mpsc::UnboundedReceiver<Job>,
) {
    let mut rng = StdRng::from_entropy();

    while let Some(job) = receiver.recv().await {
        debug!(
            title = %job.request.title,
            content_type = %job.request.content_type,
            "Dequeued fallback job"
        );

        let mut attempt = UploadAttempt::new(&config, &selectors, &snapshots, &mut rng);
        let result = attempt.run(factory.as_ref(), &job.request).await;

        // A dropped receiver just means the caller stopped waiting
        let _ = job.done.send(result);
    }

    debug!("Fallback worker queue closed");
}
