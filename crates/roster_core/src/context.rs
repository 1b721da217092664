//! Time and actor sources consumed by lifecycle operations.
//!
//! # Responsibility
//! - Provide the current timestamp for history/activity stamping.
//! - Carry caller identity explicitly instead of a process-wide global.
//!
//! # Invariants
//! - Timestamps are Unix epoch milliseconds.
//! - An `Actor` is never blank.

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix epoch milliseconds.
pub type EpochMillis = i64;

/// Actor used when a caller does not identify itself.
pub const DEFAULT_SYSTEM_ACTOR: &str = "admin";

/// Identity recorded in history and activity entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor(String);

impl Actor {
    /// Builds an actor from a trimmed, non-blank name.
    ///
    /// Returns `None` for blank input.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// The fixed system actor.
    pub fn system() -> Self {
        Self(DEFAULT_SYSTEM_ACTOR.to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Source of "now" for lifecycle operations.
pub trait Clock {
    fn now_ms(&self) -> EpochMillis;
}

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMillis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as EpochMillis)
            .unwrap_or(0)
    }
}

/// Deterministic clock for tests and replays.
///
/// Every read returns the current value and then advances it by `step_ms`.
#[derive(Debug)]
pub struct ManualClock {
    next_ms: AtomicI64,
    step_ms: i64,
}

impl ManualClock {
    pub fn new(start_ms: EpochMillis, step_ms: i64) -> Self {
        Self {
            next_ms: AtomicI64::new(start_ms),
            step_ms,
        }
    }

    /// Clock that always returns `at_ms`.
    pub fn frozen(at_ms: EpochMillis) -> Self {
        Self::new(at_ms, 0)
    }

    /// Moves the clock to `at_ms`.
    pub fn set(&self, at_ms: EpochMillis) {
        self.next_ms.store(at_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> EpochMillis {
        self.next_ms.fetch_add(self.step_ms, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::{Actor, Clock, ManualClock, SystemClock, DEFAULT_SYSTEM_ACTOR};

    #[test]
    fn actor_rejects_blank_and_trims() {
        assert!(Actor::new("   ").is_none());
        assert_eq!(Actor::new(" registrar ").unwrap().as_str(), "registrar");
        assert_eq!(Actor::system().as_str(), DEFAULT_SYSTEM_ACTOR);
    }

    #[test]
    fn manual_clock_advances_by_step() {
        let clock = ManualClock::new(1_000, 10);
        assert_eq!(clock.now_ms(), 1_000);
        assert_eq!(clock.now_ms(), 1_010);
        clock.set(5);
        assert_eq!(clock.now_ms(), 5);
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now_ms() > 0);
    }
}
