//! Manually driven clock.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::clock::Clock;

/// Clock whose time only moves when told to.
///
/// Sleeping advances the time by the requested amount and records the
/// duration. Each `now_ms` reading can also advance time by a fixed step,
/// and explicit readings can be queued to simulate a clock that jumps
/// backwards.
#[derive(Debug, Default)]
pub struct ManualClock {
    state: Mutex<ClockState>,
}

#[derive(Debug, Default)]
struct ClockState {
    now_ms: u64,
    step_ms: u64,
    queued: VecDeque<u64>,
    sleeps: Vec<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        let clock = Self::default();
        clock.lock().now_ms = start_ms;
        clock
    }

    /// Advance time by `step_ms` after every reading.
    pub fn with_step(start_ms: u64, step_ms: u64) -> Self {
        let clock = Self::new(start_ms);
        clock.lock().step_ms = step_ms;
        clock
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn advance(&self, duration_ms: u64) {
        self.lock().now_ms += duration_ms;
    }

    /// Return these values from the next readings, in order.
    pub fn queue_readings(&self, readings: &[u64]) {
        self.lock().queued.extend(readings);
    }

    pub fn sleeps(&self) -> Vec<u64> {
        self.lock().sleeps.clone()
    }

    pub fn total_slept_ms(&self) -> u64 {
        self.lock().sleeps.iter().sum()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        let mut state = self.lock();
        if let Some(reading) = state.queued.pop_front() {
            return reading;
        }
        let now = state.now_ms;
        state.now_ms += state.step_ms;
        now
    }

    fn sleep_ms(&self, duration_ms: u64) {
        let mut state = self.lock();
        state.sleeps.push(duration_ms);
        state.now_ms += duration_ms;
    }
}
