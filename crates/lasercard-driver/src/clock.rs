//! Millisecond timer and blocking sleep used by the driver.

use std::thread;
use std::time::Duration;

use chrono::Utc;

/// Time source for execution polling and nLight delays.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds. May go backwards.
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `duration_ms`.
    fn sleep_ms(&self, duration_ms: u64);
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }

    fn sleep_ms(&self, duration_ms: u64) {
        thread::sleep(Duration::from_millis(duration_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_advances_across_sleep() {
        let clock = SystemClock;
        let before = clock.now_ms();
        clock.sleep_ms(5);
        assert!(clock.now_ms() >= before);
        assert!(before > 0);
    }
}
