//! Time sources for the capture state machine
//!
//! The recorder reads its own clock on every event rather than trusting
//! timestamps carried by notifications, so all relative times share one
//! monotonic origin.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic millisecond clock with sub-millisecond resolution
pub trait Clock {
    /// Milliseconds elapsed since an arbitrary, fixed origin
    fn now_ms(&self) -> f64;
}

/// Live clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Externally driven clock.
///
/// Clones share the same reading, so a host can keep one handle while the
/// recorder owns another. Used to replay logged event streams and in tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute reading. Readings that would move backwards are ignored.
    pub fn set(&self, ms: f64) {
        if ms.is_finite() && ms >= self.now.get() {
            self.now.set(ms);
        }
    }

    pub fn advance(&self, ms: f64) {
        if ms.is_finite() && ms > 0.0 {
            self.now.set(self.now.get() + ms);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Largest stored time in milliseconds (2^53 - 1, exact in an `f64` and in a
/// JSON number)
pub const MAX_TIME_MS: u64 = 9_007_199_254_740_991;

/// Normalize an elapsed duration to whole milliseconds (nearest, not truncated),
/// capped at [`MAX_TIME_MS`]
pub fn round_ms(elapsed: f64) -> u64 {
    if !elapsed.is_finite() || elapsed <= 0.0 {
        return 0;
    }
    elapsed.round().min(MAX_TIME_MS as f64) as u64
}
