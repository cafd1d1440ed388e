//! Delivery channels for publish requests
//!
//! Two alternate channels deliver a finished video to the platform:
//!
//! - [`primary`] - the quota-limited programmatic API (thin call wrapper)
//! - [`fallback`] - the serialized UI-automation path

pub mod fallback;
pub mod primary;

pub use fallback::FallbackPublisher;
pub use primary::{ApiPublisher, PrimaryChannel, PrimaryError};
