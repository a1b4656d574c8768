//! Scanner commands and unit conversions.

use std::fmt;

use lasercard_core::constants::{MAX_POWER_UNITS, METERS_PER_MM, MICRONS_PER_MM};
use serde::{Deserialize, Serialize};

/// One entry of a device-side scan list.
///
/// Speeds are in meters per second, coordinates in micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ScanCommand {
    LaserOn,
    LaserOff,
    SetPower { units: u16 },
    SetJumpSpeed { meters_per_second: f64 },
    SetMarkSpeed { meters_per_second: f64 },
    JumpAbsolute { x: f64, y: f64 },
    MarkAbsolute { x: f64, y: f64 },
}

impl ScanCommand {
    /// SDK entry point that appends this command, used as the error tag.
    pub fn sdk_name(&self) -> &'static str {
        match self {
            ScanCommand::LaserOn => "rlListAppendLaserOn",
            ScanCommand::LaserOff => "rlListAppendLaserOff",
            ScanCommand::SetPower { .. } => "rlListAppendPower",
            ScanCommand::SetJumpSpeed { .. } => "rlListAppendJumpSpeed",
            ScanCommand::SetMarkSpeed { .. } => "rlListAppendMarkSpeed",
            ScanCommand::JumpAbsolute { .. } => "rlListAppendJumpAbs2D",
            ScanCommand::MarkAbsolute { .. } => "rlListAppendMarkAbs2D",
        }
    }

    /// Whether the command moves the scanner.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            ScanCommand::JumpAbsolute { .. } | ScanCommand::MarkAbsolute { .. }
        )
    }
}

impl fmt::Display for ScanCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanCommand::LaserOn => write!(f, "LaserOn"),
            ScanCommand::LaserOff => write!(f, "LaserOff"),
            ScanCommand::SetPower { units } => write!(f, "SetPower({})", units),
            ScanCommand::SetJumpSpeed { meters_per_second } => {
                write!(f, "SetJumpSpeed({} m/s)", meters_per_second)
            }
            ScanCommand::SetMarkSpeed { meters_per_second } => {
                write!(f, "SetMarkSpeed({} m/s)", meters_per_second)
            }
            ScanCommand::JumpAbsolute { x, y } => write!(f, "JumpAbsolute({}, {})", x, y),
            ScanCommand::MarkAbsolute { x, y } => write!(f, "MarkAbsolute({}, {})", x, y),
        }
    }
}

/// Convert a power in watts to the card's 16-bit power scale.
///
/// Rounds to nearest and clamps to `0..=65535`.
pub fn power_to_units(power_watts: f64, max_laser_power_watts: f64) -> u16 {
    let full_scale = MAX_POWER_UNITS as f64;
    let units = (full_scale * power_watts / max_laser_power_watts).round();
    units.clamp(0.0, full_scale) as u16
}

pub fn mm_per_second_to_meters_per_second(speed: f64) -> f64 {
    speed * METERS_PER_MM
}

pub fn mm_to_microns(value: f64) -> f64 {
    value * MICRONS_PER_MM
}
