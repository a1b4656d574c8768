//! Mock SDK and clock for tests and hardware-free runs.
//!
//! [`MockSdk`] records every call so tests can assert exact device
//! interaction, and [`ManualClock`] makes timeouts and delays deterministic.

mod clock;
mod sdk;

pub use clock::ManualClock;
pub use sdk::MockSdk;
