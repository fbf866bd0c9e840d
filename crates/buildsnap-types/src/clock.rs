//! Simulated monotonic clock.
//!
//! One clock is created per harness and shared (behind an `Arc`) by the
//! in-memory store and the driver. It only moves when the harness or the
//! store asks it to, so two runs of the same scenario observe the same
//! sequence of timestamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::Timestamp;

/// Default starting point: 2025-01-01T00:00:00Z.
pub const DEFAULT_EPOCH: Timestamp = Timestamp::from_millis(1_735_689_600_000);

/// Step applied by [`MonotonicClock::tick`].
pub const TICK: Duration = Duration::from_millis(1);

/// Never-decreasing simulated clock.
///
/// Reads are lock-free and safe from any thread; `tick` and `advance` use a
/// single atomic add so concurrent callers each receive a distinct,
/// strictly increasing value.
#[derive(Debug)]
pub struct MonotonicClock {
    epoch: Timestamp,
    offset_ms: AtomicU64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new(DEFAULT_EPOCH)
    }
}

impl MonotonicClock {
    #[must_use]
    pub fn new(epoch: Timestamp) -> Self {
        Self {
            epoch,
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Timestamp the clock started at.
    #[must_use]
    pub fn epoch(&self) -> Timestamp {
        self.epoch
    }

    /// Current simulated time. Does not advance the clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        let offset = self.offset_ms.load(Ordering::Acquire);
        Timestamp::from_millis(self.epoch.as_millis().saturating_add(offset))
    }

    /// Elapsed simulated time since the epoch.
    #[must_use]
    pub fn since_start(&self) -> Duration {
        Duration::from_millis(self.offset_ms.load(Ordering::Acquire))
    }

    /// Advance by one [`TICK`] and return the new time.
    pub fn tick(&self) -> Timestamp {
        self.advance(TICK)
    }

    /// Advance by `delta` (at least one tick) and return the new time.
    pub fn advance(&self, delta: Duration) -> Timestamp {
        let millis = delta.max(TICK).as_millis();
        let step = u64::try_from(millis).unwrap_or(u64::MAX);
        let previous = self.offset_ms.fetch_add(step, Ordering::AcqRel);
        let offset = previous.saturating_add(step);
        Timestamp::from_millis(self.epoch.as_millis().saturating_add(offset))
    }
}
