//! nLight driver board control.
//!
//! The board hangs off the card's digital output port and is driven by
//! setting and clearing pins with fixed settle times in between. Laser
//! modes 0..=15 are selected through the profile bits and latched with a
//! pulse on `PRO_START`.

use bitflags::bitflags;
use lasercard_core::constants::{
    MAX_NLIGHT_LASER_MODE, NLIGHT_CLEAR_ERROR_DELAY_MS, NLIGHT_EXTERNAL_CONTROL_DELAY_MS,
    NLIGHT_INTERLOCK_DELAY_MS, NLIGHT_IO_PORT, NLIGHT_SYSTEM_OFF_DELAY_MS, NLIGHT_SYSTEM_ON_DELAY_MS,
    NLIGHT_WRITE_DELAY_MS,
};
use lasercard_core::{Error, GpioAction, Result};
use tracing::{debug, info};

use crate::card::ScanCard;
use crate::clock::Clock;

bitflags! {
    /// Output pins wired to the nLight driver board.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NLightPins: u32 {
        const PRO_START = 1 << 7;
        const PRO_B1 = 1 << 8;
        const PRO_B2 = 1 << 9;
        const PRO_B3 = 1 << 10;
        const PRO_B4 = 1 << 11;
        const PRO_B5 = 1 << 12;
        const PRO_B6 = 1 << 13;
        const PRO_B7 = 1 << 14;
        const SYSTEM_ON = 1 << 15;
        const ENABLE_PROFILE = 1 << 16;
        const ARM_LASER = 1 << 18;
        const CLEAR_ERROR = 1 << 19;
        const ENABLE_AIMING_LASER = 1 << 20;
        const ENABLE_EXTERNAL_CONTROL = 1 << 21;
        const ENABLE_24V = 1 << 22;
        const GATE_IN = 1 << 23;
    }
}

/// Pins held low while the board is being switched on or off.
const INTERLOCK_PINS: NLightPins = NLightPins::ARM_LASER
    .union(NLightPins::ENABLE_AIMING_LASER)
    .union(NLightPins::GATE_IN);

/// Profile pins for mode bits 0..=3.
const MODE_BIT_PINS: [NLightPins; 4] = [
    NLightPins::PRO_B1,
    NLightPins::PRO_B2,
    NLightPins::PRO_B3,
    NLightPins::PRO_B4,
];

/// Set and clear masks that select `mode`.
pub fn mode_masks(mode: u32) -> Result<(NLightPins, NLightPins)> {
    if mode > MAX_NLIGHT_LASER_MODE {
        return Err(Error::InvalidNLightLaserMode(mode));
    }

    let mut set = NLightPins::PRO_B7;
    let mut clear = NLightPins::ENABLE_PROFILE;
    for (bit, pin) in MODE_BIT_PINS.iter().enumerate() {
        if mode & (1 << bit) != 0 {
            set |= *pin;
        } else {
            clear |= *pin;
        }
    }
    Ok((set, clear))
}

/// Borrowed view of a card's nLight board.
///
/// Delays are skipped on simulated cards.
pub struct NLightBoard<'a> {
    card: &'a mut dyn ScanCard,
    clock: &'a dyn Clock,
}

impl<'a> NLightBoard<'a> {
    pub fn new(card: &'a mut dyn ScanCard, clock: &'a dyn Clock) -> Self {
        Self { card, clock }
    }

    /// Power the board up and select mode 0.
    pub fn initialize(&mut self) -> Result<()> {
        info!("Initializing nLight driver board");
        self.set(NLightPins::ENABLE_24V)?;
        self.clear(INTERLOCK_PINS)?;
        self.wait(NLIGHT_INTERLOCK_DELAY_MS);

        self.set(NLightPins::ENABLE_EXTERNAL_CONTROL)?;
        self.wait(NLIGHT_EXTERNAL_CONTROL_DELAY_MS);

        self.clear(NLightPins::SYSTEM_ON)?;
        self.wait(NLIGHT_SYSTEM_OFF_DELAY_MS);
        self.set(NLightPins::SYSTEM_ON)?;
        self.wait(NLIGHT_SYSTEM_ON_DELAY_MS);

        self.set_mode(0)
    }

    /// Select mode 0, lock the laser out and drop the 24V supply.
    pub fn disable(&mut self) -> Result<()> {
        info!("Disabling nLight driver board");
        self.set_mode(0)?;
        self.clear(INTERLOCK_PINS)?;
        self.wait(NLIGHT_INTERLOCK_DELAY_MS);

        self.set(NLightPins::ENABLE_EXTERNAL_CONTROL)?;
        self.wait(NLIGHT_INTERLOCK_DELAY_MS);

        self.clear(NLightPins::ENABLE_24V)
    }

    /// Pulse the error-clear line.
    pub fn clear_error(&mut self) -> Result<()> {
        debug!("Clearing nLight error");
        self.clear(NLightPins::CLEAR_ERROR)?;
        self.wait(NLIGHT_WRITE_DELAY_MS);
        self.set(NLightPins::CLEAR_ERROR)?;
        self.wait(NLIGHT_CLEAR_ERROR_DELAY_MS);
        Ok(())
    }

    /// Select laser mode `mode` (0..=15) and latch it.
    pub fn set_mode(&mut self, mode: u32) -> Result<()> {
        let (set, clear) = mode_masks(mode)?;
        debug!(mode, set = set.bits(), clear = clear.bits(), "Setting nLight laser mode");

        self.set(set)?;
        self.wait(NLIGHT_WRITE_DELAY_MS);
        self.clear(clear)?;
        self.wait(NLIGHT_WRITE_DELAY_MS);

        self.set(NLightPins::PRO_START)?;
        self.wait(NLIGHT_WRITE_DELAY_MS);
        self.clear(NLightPins::PRO_START)?;
        self.wait(NLIGHT_WRITE_DELAY_MS);
        Ok(())
    }

    fn set(&mut self, pins: NLightPins) -> Result<()> {
        self.card.gpio_write(NLIGHT_IO_PORT, GpioAction::Set, pins.bits())
    }

    fn clear(&mut self, pins: NLightPins) -> Result<()> {
        self.card.gpio_write(NLIGHT_IO_PORT, GpioAction::Clear, pins.bits())
    }

    fn wait(&self, duration_ms: u64) {
        if !self.card.is_simulated() {
            self.clock.sleep_ms(duration_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{RealCard, SimulatedCard};
    use crate::mock::{ManualClock, MockSdk};
    use crate::sdk::Sdk;
    use rstest::rstest;
    use std::sync::Arc;

    fn real_card() -> (Arc<MockSdk>, RealCard) {
        let mock = Arc::new(MockSdk::new());
        let card = RealCard::connect(Sdk::new(mock.clone()), "10.0.0.5", 2000).unwrap();
        (mock, card)
    }

    #[test]
    fn test_mode_5_masks() {
        let (set, clear) = mode_masks(5).unwrap();
        assert_eq!(set, NLightPins::PRO_B7 | NLightPins::PRO_B1 | NLightPins::PRO_B3);
        assert_eq!(clear, NLightPins::ENABLE_PROFILE | NLightPins::PRO_B2 | NLightPins::PRO_B4);
    }

    #[rstest]
    #[case(0, NLightPins::PRO_B7)]
    #[case(15, NLightPins::PRO_B7.union(NLightPins::PRO_B1).union(NLightPins::PRO_B2).union(NLightPins::PRO_B3).union(NLightPins::PRO_B4))]
    fn test_mode_set_mask(#[case] mode: u32, #[case] expected: NLightPins) {
        assert_eq!(mode_masks(mode).unwrap().0, expected);
    }

    #[rstest]
    #[case(16)]
    #[case(255)]
    fn test_invalid_mode(#[case] mode: u32) {
        assert!(matches!(mode_masks(mode), Err(Error::InvalidNLightLaserMode(m)) if m == mode));
    }

    #[test]
    fn test_set_mode_write_sequence() {
        let (mock, mut card) = real_card();
        let clock = ManualClock::new(0);

        NLightBoard::new(&mut card, &clock).set_mode(5).unwrap();

        let (set, clear) = mode_masks(5).unwrap();
        assert_eq!(
            mock.gpio_writes(),
            vec![
                (GpioAction::Set, set.bits()),
                (GpioAction::Clear, clear.bits()),
                (GpioAction::Set, NLightPins::PRO_START.bits()),
                (GpioAction::Clear, NLightPins::PRO_START.bits()),
            ]
        );
        assert_eq!(clock.sleeps(), vec![10, 10, 10, 10]);
    }

    #[test]
    fn test_invalid_mode_writes_nothing() {
        let (mock, mut card) = real_card();
        let clock = ManualClock::new(0);

        let result = NLightBoard::new(&mut card, &clock).set_mode(16);
        assert!(matches!(result, Err(Error::InvalidNLightLaserMode(16))));
        assert!(mock.gpio_writes().is_empty());
    }

    #[test]
    fn test_initialize_sequence() {
        let (mock, mut card) = real_card();
        let clock = ManualClock::new(0);

        NLightBoard::new(&mut card, &clock).initialize().unwrap();

        let writes = mock.gpio_writes();
        assert_eq!(
            &writes[..5],
            &[
                (GpioAction::Set, NLightPins::ENABLE_24V.bits()),
                (GpioAction::Clear, INTERLOCK_PINS.bits()),
                (GpioAction::Set, NLightPins::ENABLE_EXTERNAL_CONTROL.bits()),
                (GpioAction::Clear, NLightPins::SYSTEM_ON.bits()),
                (GpioAction::Set, NLightPins::SYSTEM_ON.bits()),
            ]
        );
        // Followed by the four mode 0 writes
        assert_eq!(writes.len(), 9);
        assert_eq!(clock.sleeps(), vec![1000, 3000, 3000, 2000, 10, 10, 10, 10]);
    }

    #[test]
    fn test_disable_sequence() {
        let (mock, mut card) = real_card();
        let clock = ManualClock::new(0);

        NLightBoard::new(&mut card, &clock).disable().unwrap();

        let writes = mock.gpio_writes();
        assert_eq!(writes.len(), 7);
        assert_eq!(
            &writes[4..],
            &[
                (GpioAction::Clear, INTERLOCK_PINS.bits()),
                (GpioAction::Set, NLightPins::ENABLE_EXTERNAL_CONTROL.bits()),
                (GpioAction::Clear, NLightPins::ENABLE_24V.bits()),
            ]
        );
        assert_eq!(clock.sleeps(), vec![10, 10, 10, 10, 1000, 1000]);
    }

    #[test]
    fn test_clear_error_pulse() {
        let (mock, mut card) = real_card();
        let clock = ManualClock::new(0);

        NLightBoard::new(&mut card, &clock).clear_error().unwrap();

        assert_eq!(
            mock.gpio_writes(),
            vec![
                (GpioAction::Clear, NLightPins::CLEAR_ERROR.bits()),
                (GpioAction::Set, NLightPins::CLEAR_ERROR.bits()),
            ]
        );
        assert_eq!(clock.total_slept_ms(), 1010);
    }

    #[test]
    fn test_simulated_card_skips_delays() {
        let mut card = SimulatedCard::new().unwrap();
        let clock = ManualClock::new(0);

        NLightBoard::new(&mut card, &clock).initialize().unwrap();
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_gpio_failure_stops_sequence() {
        let (mock, mut card) = real_card();
        mock.fail_next("gpio_write", 7, "io fault");
        let clock = ManualClock::new(0);

        let result = NLightBoard::new(&mut card, &clock).clear_error();
        assert!(matches!(result, Err(Error::Device { status: 7, .. })));
        assert!(clock.sleeps().is_empty());
    }
}
