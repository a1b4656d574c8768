//! Core constants for the laser scanner card driver.
//!
//! This module collects every numeric limit and timing value the driver
//! relies on, so that field buffers, list builders and the nLight protocol
//! agree on the same figures.
//!
//! # Usage
//!
//! ```
//! use lasercard_core::constants::*;
//!
//! fn is_valid_slot(slot: u32) -> bool {
//!     slot < MAX_LIST_ID_ON_CARD
//! }
//!
//! assert!(is_valid_slot(0));
//! assert!(!is_valid_slot(256));
//! ```

// ============================================================================
// Field Buffer Limits
// ============================================================================

/// Maximum length of field and variable names.
pub const MAX_FIELD_NAME_LENGTH: usize = 256;

/// Minimum size of a field buffer in bytes.
pub const MIN_FIELD_DATA_SIZE: usize = 4;

/// Maximum size of a field buffer in bytes (1 MiB).
pub const MAX_FIELD_DATA_SIZE: usize = 1024 * 1024;

// ============================================================================
// Card Connection
// ============================================================================

/// Lowest TCP port accepted for a card connection.
pub const MIN_CARD_PORT: u32 = 32;

/// Highest TCP port accepted for a card connection.
pub const MAX_CARD_PORT: u32 = 65535;

/// Smallest maximum laser power a card may be configured with, in watts.
pub const MIN_LASER_POWER_WATTS: f64 = 0.1;

// ============================================================================
// Scan Lists
// ============================================================================

/// Number of list slots available on a card. Valid slot ids are `0..MAX_LIST_ID_ON_CARD`.
pub const MAX_LIST_ID_ON_CARD: u32 = 256;

/// Slot used by single-list layer drawing.
pub const DEFAULT_LIST_ID: u32 = 0;

/// Execution limit passed to the card for lists that repeat without bound.
pub const UNBOUNDED_EXECUTION_LIMIT: i32 = -1;

/// Full scale of the card's power channel.
pub const MAX_POWER_UNITS: u16 = 65535;

/// Conversion factor from millimeters to the card's micrometer coordinates.
pub const MICRONS_PER_MM: f64 = 1000.0;

/// Conversion factor from millimeters per second to meters per second.
pub const METERS_PER_MM: f64 = 0.001;

/// Poll interval used while waiting for a list to finish, in milliseconds.
pub const EXECUTION_POLL_INTERVAL_MS: u32 = 100;

/// Default overall scanning timeout for a layer, in milliseconds.
pub const DEFAULT_SCANNING_TIMEOUT_MS: u64 = 300_000;

/// Toolpath profile key holding the laser a segment is assigned to.
pub const LASER_INDEX_PROFILE_KEY: &str = "laserindex";

/// Laser index meaning "not assigned to any laser".
pub const UNASSIGNED_LASER_INDEX: i64 = 0;

// ============================================================================
// nLight Driver Board
// ============================================================================

/// Digital I/O port the nLight driver board is wired to.
pub const NLIGHT_IO_PORT: u32 = 0;

/// Highest laser mode selectable on the nLight board.
pub const MAX_NLIGHT_LASER_MODE: u32 = 15;

/// Delay after each mode-select write, in milliseconds.
pub const NLIGHT_WRITE_DELAY_MS: u64 = 10;

/// Settling delay after dropping the interlock outputs, in milliseconds.
pub const NLIGHT_INTERLOCK_DELAY_MS: u64 = 1000;

/// Delay after enabling external control during initialization, in milliseconds.
pub const NLIGHT_EXTERNAL_CONTROL_DELAY_MS: u64 = 3000;

/// Delay the board needs while system power is cycled off, in milliseconds.
pub const NLIGHT_SYSTEM_OFF_DELAY_MS: u64 = 3000;

/// Delay the board needs after system power comes back, in milliseconds.
pub const NLIGHT_SYSTEM_ON_DELAY_MS: u64 = 2000;

/// Delay after the error-clear pulse, in milliseconds.
pub const NLIGHT_CLEAR_ERROR_DELAY_MS: u64 = 1000;
