//! Phase timing for the build pipeline.
//!
//! Each build phase (solve, verify, prepare, save) is timed twice: a raw
//! cycle count where the architecture exposes one, and a wall-clock
//! microsecond count that is unaffected by frequency scaling. Both values
//! are persisted in the table metadata record.

use std::time::Instant;

/// A completed phase measurement.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TimerSnapshot {
    /// Elapsed timestamp-counter cycles; zero where unavailable.
    pub cycles: u64,
    /// Elapsed wall-clock microseconds.
    pub micros: u64,
}

/// A running phase timer.
#[derive(Clone, Copy, Debug)]
pub(crate) struct IntervalTimer {
    start_cycles: u64,
    start: Instant,
}

impl IntervalTimer {
    /// Starts timing now.
    pub(crate) fn start() -> Self {
        Self {
            start_cycles: read_cycle_counter(),
            start: Instant::now(),
        }
    }

    /// Captures the elapsed time without stopping the timer.
    pub(crate) fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            cycles: read_cycle_counter().saturating_sub(self.start_cycles),
            micros: u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX),
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn read_cycle_counter() -> u64 {
    // SAFETY: RDTSC has no memory or register preconditions.
    unsafe { core::arch::x86_64::_rdtsc() }
}

#[cfg(not(target_arch = "x86_64"))]
fn read_cycle_counter() -> u64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_are_monotonic() {
        let timer = IntervalTimer::start();
        let first = timer.snapshot();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = timer.snapshot();
        assert!(second.micros >= first.micros);
        assert!(second.micros >= 2_000);
    }
}
