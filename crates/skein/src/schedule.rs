//! # Loop Scheduling
//!
//! Fixed-rate tick driver for one context thread. Each loop sleeps toward
//! its own next deadline; it never waits on another loop. Suspension points
//! are exactly one: awaiting the next scheduled tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared stop flag for a set of loops.
#[derive(Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Creates a flag in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Requests every loop watching this flag to finish its current tick
    /// and exit.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True once a stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Runs `tick_fn` at `tick_rate` ticks per second until the flag stops.
///
/// Deadline-based: a slow tick eats into the next sleep rather than
/// shifting the whole schedule. Returns the number of ticks executed.
pub fn run_at_rate(tick_rate: u32, stop: &StopFlag, mut tick_fn: impl FnMut()) -> u64 {
    assert!(tick_rate > 0, "tick rate must be greater than zero");
    let period = Duration::from_secs_f64(1.0 / f64::from(tick_rate));

    let mut ticks = 0u64;
    let mut next_deadline = Instant::now() + period;

    while !stop.is_stopped() {
        tick_fn();
        ticks += 1;

        let now = Instant::now();
        if next_deadline > now {
            std::thread::sleep(next_deadline - now);
        }
        next_deadline += period;
        // After a long stall, resynchronize instead of bursting.
        if next_deadline < Instant::now() {
            next_deadline = Instant::now() + period;
        }
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_flag_ends_loop() {
        let stop = StopFlag::new();
        let watcher = stop.clone();

        let handle = std::thread::spawn(move || {
            run_at_rate(1000, &watcher, || {})
        });

        std::thread::sleep(Duration::from_millis(30));
        stop.stop();
        let ticks = handle.join().unwrap();
        assert!(ticks > 0);
    }

    #[test]
    fn test_rate_is_roughly_honored() {
        let stop = StopFlag::new();
        let watcher = stop.clone();
        let handle = std::thread::spawn(move || run_at_rate(100, &watcher, || {}));

        std::thread::sleep(Duration::from_millis(200));
        stop.stop();
        let ticks = handle.join().unwrap();
        // 100 Hz for ~200ms: allow generous scheduling slack.
        assert!(ticks >= 5 && ticks <= 60, "unexpected tick count {ticks}");
    }
}
