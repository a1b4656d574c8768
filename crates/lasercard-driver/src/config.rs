//! Driver configuration.
//!
//! A [`DriverConfig`] lists the cards to connect with their laser settings,
//! and is usually loaded from JSON:
//!
//! ```
//! use lasercard_driver::DriverConfig;
//!
//! let config = DriverConfig::from_json(r#"{
//!     "simulation_mode": true,
//!     "cards": [
//!         { "name": "left", "ip": "192.168.1.10", "port": 2000,
//!           "max_laser_power_watts": 400.0, "laser_index": 1 }
//!     ]
//! }"#)?;
//!
//! assert_eq!(config.cards[0].port, 2000);
//! assert_eq!(config.scanning_timeout_ms, 300_000);
//! # Ok::<(), lasercard_core::Error>(())
//! ```

use std::fs;
use std::path::Path;

use lasercard_core::constants::{
    DEFAULT_SCANNING_TIMEOUT_MS, MAX_CARD_PORT, MIN_CARD_PORT, MIN_LASER_POWER_WATTS,
};
use lasercard_core::{CoordinateTransform, Error, Result};
use serde::{Deserialize, Serialize};

/// Top-level driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Name reported by the driver.
    pub name: String,

    /// Run without any device I/O.
    pub simulation_mode: bool,

    /// Overall timeout for drawing one layer.
    pub scanning_timeout_ms: u64,

    pub cards: Vec<CardConfig>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: "lasercard".to_string(),
            simulation_mode: false,
            scanning_timeout_ms: DEFAULT_SCANNING_TIMEOUT_MS,
            cards: Vec::new(),
        }
    }
}

impl DriverConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::config(format!("invalid driver config: {}", e)))?;
        for card in &config.cards {
            card.validate()?;
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Connection and laser settings of one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    pub name: String,
    pub ip: String,
    pub port: u32,
    pub max_laser_power_watts: f64,

    /// Laser this card drives in multi-laser drawing; 0 means none.
    #[serde(default)]
    pub laser_index: u32,

    #[serde(default)]
    pub transform: Option<TransformConfig>,
}

impl CardConfig {
    pub fn new(name: &str, ip: &str, port: u32, max_laser_power_watts: f64) -> Self {
        Self {
            name: name.to_string(),
            ip: ip.to_string(),
            port,
            max_laser_power_watts,
            laser_index: 0,
            transform: None,
        }
    }

    /// Check name, address, port and power limits.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCardName` / `Error::InvalidCardIp` for empty values
    /// - `Error::InvalidCardPort` outside 32..=65535
    /// - `Error::InvalidLaserPower` below 0.1 W
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidCardName);
        }
        if self.ip.is_empty() {
            return Err(Error::InvalidCardIp);
        }
        if !(MIN_CARD_PORT..=MAX_CARD_PORT).contains(&self.port) {
            return Err(Error::InvalidCardPort(self.port));
        }
        if self.max_laser_power_watts.is_nan() || self.max_laser_power_watts < MIN_LASER_POWER_WATTS {
            return Err(Error::InvalidLaserPower(self.max_laser_power_watts));
        }
        Ok(())
    }

    pub fn coordinate_transform(&self) -> CoordinateTransform {
        self.transform
            .as_ref()
            .map(TransformConfig::to_transform)
            .unwrap_or_default()
    }
}

/// Scanner calibration: matrix plus offset in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub m11: f64,
    pub m12: f64,
    pub m21: f64,
    pub m22: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            m11: 1.0,
            m12: 0.0,
            m21: 0.0,
            m22: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl TransformConfig {
    pub fn to_transform(&self) -> CoordinateTransform {
        let mut transform = CoordinateTransform::identity();
        transform.set_rotational(self.m11, self.m12, self.m21, self.m22);
        transform.set_translational(self.offset_x, self.offset_y);
        transform
    }
}
