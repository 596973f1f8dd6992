//! Run Deadline
//!
//! Cooperative cancellation for a minimization run.
//!
//! ## Design
//!
//! Uses a combination of:
//! - Atomic flag for cancellation from another thread
//! - Optional wall-clock timeout measured from construction
//!
//! The minimizer checks the deadline at loop iteration boundaries only,
//! so the statement it holds when stopping is always a complete,
//! previously accepted one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a deadline check failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("run cancelled after {elapsed:?}")]
    Cancelled { elapsed: Duration },

    #[error("run exceeded timeout of {timeout:?} (ran for {elapsed:?})")]
    TimedOut { timeout: Duration, elapsed: Duration },
}

/// Deadline controller for one minimization run
///
/// Cloning shares the cancellation flag.
#[derive(Debug, Clone)]
pub struct RunDeadline {
    /// Cancellation flag (shared across threads)
    cancelled: Arc<AtomicBool>,

    /// When the run started
    start_time: Instant,

    /// Maximum allowed duration
    timeout: Option<Duration>,
}

impl RunDeadline {
    /// Create a deadline with an optional timeout, starting now
    pub fn new(timeout: Option<Duration>) -> Self {
        RunDeadline {
            cancelled: Arc::new(AtomicBool::new(false)),
            start_time: Instant::now(),
            timeout,
        }
    }

    /// Deadline that only stops on explicit cancellation
    pub fn unbounded() -> Self {
        RunDeadline::new(None)
    }

    /// Deadline from a millisecond count, where 0 means no timeout
    pub fn from_millis(timeout_ms: u64) -> Self {
        RunDeadline::new((timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)))
    }

    /// Check if the run may continue
    pub fn check(&self) -> Result<(), Interrupted> {
        let elapsed = self.start_time.elapsed();

        if self.cancelled.load(Ordering::Relaxed) {
            return Err(Interrupted::Cancelled { elapsed });
        }

        if let Some(timeout) = self.timeout {
            if elapsed > timeout {
                return Err(Interrupted::TimedOut { timeout, elapsed });
            }
        }

        Ok(())
    }

    /// Cancel the run explicitly
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Time since the deadline was created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Time left before the timeout, if there is one
    pub fn remaining(&self) -> Option<Duration> {
        self.timeout
            .map(|timeout| timeout.saturating_sub(self.start_time.elapsed()))
    }

    /// Get a handle that can cancel the run from another thread
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }
}

impl Default for RunDeadline {
    fn default() -> Self {
        RunDeadline::unbounded()
    }
}

/// Handle for cancelling a run from another thread
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel the associated run
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
