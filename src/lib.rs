//! songchul - Resilient video publishing core
//!
//! A quota-aware publish pipeline that delivers finished videos through a
//! primary API channel with an automatic UI-automation fallback, durable
//! failure storage, and a scheduled retry drain.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`quota`] - Persisted daily quota flag
//! - [`dedup`] - Published-source index guaranteeing idempotent delivery
//! - [`store`] - Durable store for uploads that failed on both channels
//! - [`publisher`] - Primary API channel and UI-automation fallback
//! - [`orchestrator`] - Channel-failover chain producing one outcome type
//! - [`scheduler`] - Retry drain and recurring-task plumbing
//!
//! # Example
//!
//! ```no_run
//! use songchul::config::Config;
//! use songchul::models::{ContentType, PublishRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let request = PublishRequest::new("제목", "/data/out/final.mp4", ContentType::Shorts);
//!     // orchestrator.publish(request).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod publisher;
pub mod quota;
pub mod scheduler;
pub mod store;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::dedup::DeduplicationIndex;
    pub use crate::error::{Error, ErrorCategory, Result, SongchulErrorTrait};
    pub use crate::models::{
        ChannelUsed, ContentType, PrivacyStatus, PublishOutcome, PublishRequest, UploadedVideo,
    };
    pub use crate::orchestrator::PublishOrchestrator;
    pub use crate::publisher::{ApiPublisher, FallbackPublisher, PrimaryChannel};
    pub use crate::quota::QuotaManager;
    pub use crate::scheduler::{RetryReport, RetryScheduler};
    pub use crate::store::{DurableFailureStore, RetryScope};
}

// Direct re-exports for convenience
pub use models::{ContentType, PublishOutcome, PublishRequest, UploadedVideo};
