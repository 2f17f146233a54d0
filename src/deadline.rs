//! Single-fire deadline for one attempt.
//!
//! The deadline is owned by the attempt's event loop, so arming, firing and
//! cancelling never race: whichever the loop processes first moves the
//! deadline out of `Armed` and the other becomes a no-op.

use std::future::pending;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Armed { started: Instant },
    Cancelled,
    Fired,
}

#[derive(Debug)]
pub struct Deadline {
    timeout: Duration,
    phase: Phase,
}

impl Deadline {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            phase: Phase::Idle,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start the countdown. Only an idle deadline can be armed.
    pub fn arm(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.phase = Phase::Armed {
            started: Instant::now(),
        };
        true
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.phase, Phase::Armed { .. })
    }

    /// When the deadline will fire, if it is still armed.
    pub fn expires_at(&self) -> Option<Instant> {
        match self.phase {
            Phase::Armed { started } => Some(started + self.timeout),
            _ => None,
        }
    }

    /// Disarm. Returns `false` if the deadline was not armed.
    pub fn cancel(&mut self) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.phase = Phase::Cancelled;
        true
    }

    /// Consume the armed deadline and report how long it ran.
    pub fn fire(&mut self) -> Option<Duration> {
        match self.phase {
            Phase::Armed { started } => {
                self.phase = Phase::Fired;
                Some(started.elapsed())
            }
            _ => None,
        }
    }
}

/// Sleep until `at`, or forever when there is nothing to wait for.
pub(crate) async fn sleep_until_or_pending(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => pending::<()>().await,
    }
}
