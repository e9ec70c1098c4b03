//! Countdown clock.
//!
//! The clock is a cooperative countdown with no internal thread. The owner
//! calls `advance()` once per second (see `session::runtime`); the clock
//! reports a tick with the remaining seconds, or expiry when the countdown
//! reaches zero.
//!
//! ## Lifecycle
//!
//! ```text
//! Disarmed -> arm(d) -> Armed -> advance()* -> Expired (disarmed)
//!                          \-> disarm() -> Disarmed
//! ```
//!
//! Expiry is reported exactly once per `arm()`; after it the clock is
//! disarmed and `advance()` returns `None` until it is armed again.

/// What a single clock step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// Countdown still running with `remaining` seconds left.
    Tick { remaining: u64 },
    /// Countdown reached zero. The clock is now disarmed.
    Expired,
}

#[derive(Debug, Clone, Default)]
pub struct Clock {
    remaining: u64,
    armed: bool,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down from `duration_secs`.
    ///
    /// Returns the initial tick (`remaining == duration_secs`). Re-arming an
    /// armed clock replaces the previous countdown.
    pub fn arm(&mut self, duration_secs: u64) -> ClockSignal {
        self.remaining = duration_secs;
        self.armed = true;
        ClockSignal::Tick {
            remaining: duration_secs,
        }
    }

    /// Cancel the countdown. Idempotent.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `None` when disarmed.
    pub fn advance(&mut self) -> Option<ClockSignal> {
        if !self.armed {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.armed = false;
            return Some(ClockSignal::Expired);
        }
        Some(ClockSignal::Tick {
            remaining: self.remaining,
        })
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}
