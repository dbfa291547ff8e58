//! Bounded polling for text in captured terminal output.
//!
//! tmux has no push notification for "this text is now on screen", only a
//! point-in-time pane dump, so waits are modelled as a fixed-interval loop
//! against a wall-clock deadline fixed at entry. Timing out is a normal
//! outcome.

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, trace};

/// Result of waiting for a substring in captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The needle was seen; carries the buffer it was found in.
    Matched(String),
    TimedOut,
}

impl PollOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// Interval + timeout pair driving a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Poller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Repeatedly call `capture` until its output contains `needle` or the
    /// deadline passes.
    ///
    /// Capture errors count as "not seen yet". The loop never sleeps past the
    /// deadline, so a miss returns within one interval (plus the cost of the
    /// last capture) after `timeout`.
    pub fn wait_for<F>(&self, needle: &str, mut capture: F) -> PollOutcome
    where
        F: FnMut() -> Result<String>,
    {
        let deadline = Instant::now() + self.timeout;
        loop {
            match capture() {
                Ok(buf) if buf.contains(needle) => {
                    debug!(needle, "expected text observed");
                    return PollOutcome::Matched(buf);
                }
                Ok(_) => {}
                Err(e) => trace!(error = %e, "capture failed while polling"),
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(self.interval.min(deadline - now));
            if Instant::now() >= deadline {
                break;
            }
        }
        debug!(needle, timeout_ms = self.timeout.as_millis() as u64, "wait timed out");
        PollOutcome::TimedOut
    }
}
