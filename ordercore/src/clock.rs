//! Clock port.
//!
//! Reservation TTL comparisons and audit timestamps go through an injected
//! clock so tests can control time instead of sleeping through TTLs.

use crate::types::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current moment.
    fn now(&self) -> Timestamp;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_tracks_wall_time() {
        let before = Timestamp::now();
        let now = SystemClock.now();
        let after = Timestamp::now();
        assert!(now >= before);
        assert!(now <= after);
    }
}
