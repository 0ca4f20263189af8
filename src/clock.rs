//! A monotonic-ish clock source for the hints table's penalty TTLs.
//!
//! Per §5: advances only when the wall clock advances; a backward wall-clock
//! jump holds steady instead of reporting time moving backward, so a penalty
//! box can never be re-extended by a clock reset. The source is injected at
//! construction, the same way the random-source hook is, rather than read
//! from a process-wide singleton (see `DESIGN.md`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the "now" used by the hints table's penalty-TTL comparisons.
pub trait ClockSource: Send + Sync {
    /// Seconds since an arbitrary but consistent epoch.
    fn now(&self) -> u64;
}

/// A clock backed by the system wall clock, floored so it never regresses.
#[derive(Debug, Default)]
pub struct SystemClock {
    floor: AtomicU64,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            floor: AtomicU64::new(0),
        }
    }

    fn wall_clock_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> u64 {
        let observed = Self::wall_clock_secs();
        let mut current = self.floor.load(Ordering::Relaxed);
        loop {
            if observed <= current {
                return current;
            }
            match self.floor.compare_exchange_weak(
                current,
                observed,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return observed,
                Err(actual) => current = actual,
            }
        }
    }
}

/// A manually-advanced clock for deterministic tests (§8 scenario 6's
/// "simulated clock advance").
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> ManualClock {
        ManualClock {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::Relaxed);
    }

    pub fn set(&self, secs: u64) {
        self.now.store(secs, Ordering::Relaxed);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_demand() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(30);
        assert_eq!(clock.now(), 130);
    }
}
