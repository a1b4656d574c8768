//! Enum wrapper for card backend dispatch.
//!
//! A session picks its backend once, at connect time, and then talks to it
//! only through [`ScanCard`]. [`AnyCard`] provides that dispatch without
//! boxing.
//!
//! # Examples
//!
//! ```
//! use lasercard_driver::card::{ScanCard, SimulatedCard};
//! use lasercard_driver::devices::AnyCard;
//!
//! let mut card = AnyCard::Simulated(SimulatedCard::new()?);
//! card.arm_laser(true)?;
//! assert!(card.is_laser_armed()?);
//! # Ok::<(), lasercard_core::Error>(())
//! ```

use std::path::{Path, PathBuf};

use lasercard_core::{CoordinateTransform, GpioAction, LaserStatus, Result};
use lasercard_schema::LaserConfig;

use crate::card::{RealCard, ScanCard, SimulatedCard};
use crate::list::ScanList;

/// Real or simulated card.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCard {
    /// Card reached through the vendor SDK.
    Real(RealCard),
    /// In-memory card for simulation mode.
    Simulated(SimulatedCard),
}

impl ScanCard for AnyCard {
    fn is_simulated(&self) -> bool {
        match self {
            Self::Real(card) => card.is_simulated(),
            Self::Simulated(card) => card.is_simulated(),
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Real(card) => card.is_connected(),
            Self::Simulated(card) => card.is_connected(),
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        match self {
            Self::Real(card) => card.disconnect(),
            Self::Simulated(card) => card.disconnect(),
        }
    }

    fn reset_to_system_defaults(&mut self) -> Result<()> {
        match self {
            Self::Real(card) => card.reset_to_system_defaults(),
            Self::Simulated(card) => card.reset_to_system_defaults(),
        }
    }

    fn laser_on(&mut self) -> Result<()> {
        match self {
            Self::Real(card) => card.laser_on(),
            Self::Simulated(card) => card.laser_on(),
        }
    }

    fn laser_off(&mut self) -> Result<()> {
        match self {
            Self::Real(card) => card.laser_off(),
            Self::Simulated(card) => card.laser_off(),
        }
    }

    fn arm_laser(&mut self, armed: bool) -> Result<()> {
        match self {
            Self::Real(card) => card.arm_laser(armed),
            Self::Simulated(card) => card.arm_laser(armed),
        }
    }

    fn is_laser_armed(&self) -> Result<bool> {
        match self {
            Self::Real(card) => card.is_laser_armed(),
            Self::Simulated(card) => card.is_laser_armed(),
        }
    }

    fn enable_pilot(&mut self, enabled: bool) -> Result<()> {
        match self {
            Self::Real(card) => card.enable_pilot(enabled),
            Self::Simulated(card) => card.enable_pilot(enabled),
        }
    }

    fn is_pilot_enabled(&self) -> Result<bool> {
        match self {
            Self::Real(card) => card.is_pilot_enabled(),
            Self::Simulated(card) => card.is_pilot_enabled(),
        }
    }

    fn laser_status(&self) -> Result<LaserStatus> {
        match self {
            Self::Real(card) => card.laser_status(),
            Self::Simulated(card) => card.laser_status(),
        }
    }

    fn read_laser_config(&self) -> Result<LaserConfig> {
        match self {
            Self::Real(card) => card.read_laser_config(),
            Self::Simulated(card) => card.read_laser_config(),
        }
    }

    fn write_laser_config(&mut self, config: &LaserConfig) -> Result<()> {
        match self {
            Self::Real(card) => card.write_laser_config(config),
            Self::Simulated(card) => card.write_laser_config(config),
        }
    }

    fn enable_command_logging(&mut self, directory: &Path) -> Result<Option<PathBuf>> {
        match self {
            Self::Real(card) => card.enable_command_logging(directory),
            Self::Simulated(card) => card.enable_command_logging(directory),
        }
    }

    fn disable_command_logging(&mut self) -> Result<()> {
        match self {
            Self::Real(card) => card.disable_command_logging(),
            Self::Simulated(card) => card.disable_command_logging(),
        }
    }

    fn gpio_write(&mut self, port: u32, action: GpioAction, mask: u32) -> Result<()> {
        match self {
            Self::Real(card) => card.gpio_write(port, action, mask),
            Self::Simulated(card) => card.gpio_write(port, action, mask),
        }
    }

    fn abort_list_execution_if_in_progress(&mut self) -> Result<bool> {
        match self {
            Self::Real(card) => card.abort_list_execution_if_in_progress(),
            Self::Simulated(card) => card.abort_list_execution_if_in_progress(),
        }
    }

    fn create_list(&self, max_laser_power_watts: f64, transform: CoordinateTransform) -> Result<ScanList> {
        match self {
            Self::Real(card) => card.create_list(max_laser_power_watts, transform),
            Self::Simulated(card) => card.create_list(max_laser_power_watts, transform),
        }
    }
}
