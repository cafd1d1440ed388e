//! Recurring task plumbing
//!
//! Run-level mutual exclusion for tasks a timer may fire while the previous
//! run is still going, plus the wall-clock math for daily boundaries. The
//! timer cadence itself lives with the caller; this module only guarantees
//! that overlapping triggers collapse into one running instance.

use chrono::{Duration as ChronoDuration, Local, NaiveTime, TimeZone};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A named task that refuses to overlap with itself
///
/// `try_begin` is a compare-and-swap: the winner gets a guard that releases
/// the slot on drop, every loser gets `None` and should skip the run.
pub struct RecurringTask {
    name: &'static str,
    running: Arc<AtomicBool>,
}

impl RecurringTask {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claim the run slot; `None` means a previous run is still active
    pub fn try_begin(&self) -> Option<RunGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!(task = self.name, "Run slot acquired");
            Some(RunGuard {
                name: self.name,
                running: Arc::clone(&self.running),
            })
        } else {
            debug!(task = self.name, "Run slot busy, skipping");
            None
        }
    }

    /// Whether a run currently holds the slot
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Releases the parent task's run slot when dropped
pub struct RunGuard {
    name: &'static str,
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        debug!(task = self.name, "Run slot released");
    }
}

/// Time until the next local-clock occurrence of `target`
///
/// If the boundary already passed today, the result points at tomorrow's
/// occurrence. Falls back to one minute when the local datetime is ambiguous
/// around a DST transition.
pub fn duration_until_daily(target: NaiveTime) -> Duration {
    let now = Local::now();
    let today = now.date_naive();

    let upcoming = if now.time() < target {
        today.and_time(target)
    } else {
        (today + ChronoDuration::days(1)).and_time(target)
    };

    Local
        .from_local_datetime(&upcoming)
        .earliest()
        .map(|dt| dt.signed_duration_since(now))
        .and_then(|d| d.to_std().ok())
        .unwrap_or(Duration::from_secs(60))
}
