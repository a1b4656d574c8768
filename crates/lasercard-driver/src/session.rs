//! A connected card and its laser settings.
//!
//! A [`CardSession`] is created by validating a [`CardConfig`] and
//! connecting either a real card through the SDK or a simulated one. It
//! owns the card for its whole lifetime and disconnects it on drop.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use lasercard_driver::{CardConfig, CardSession, LayerData, SystemClock};
//!
//! let config = CardConfig::new("left", "192.168.1.10", 2000, 400.0);
//! let mut session = CardSession::connect(&config, None, Arc::new(SystemClock), true)?;
//!
//! assert!(session.is_connected());
//! session.draw_layer(&LayerData::new(1.0), 1000)?;
//! # Ok::<(), lasercard_core::Error>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lasercard_core::constants::DEFAULT_LIST_ID;
use lasercard_core::{CoordinateTransform, Error, LaserStatus, Result};
use lasercard_schema::LaserConfig;
use tracing::{debug, info, warn};

use crate::card::{RealCard, ScanCard, SimulatedCard};
use crate::clock::Clock;
use crate::config::CardConfig;
use crate::devices::AnyCard;
use crate::execution::{ExecutionController, wait_for_completion};
use crate::list::ScanList;
use crate::nlight::NLightBoard;
use crate::sdk::Sdk;
use crate::toolpath::ToolpathLayer;

/// One connected card.
pub struct CardSession {
    name: String,
    ip: String,
    port: u32,
    max_laser_power_watts: f64,
    assigned_laser_index: u32,
    transform: CoordinateTransform,
    card: AnyCard,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardSession")
            .field("name", &self.name)
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("max_laser_power_watts", &self.max_laser_power_watts)
            .field("assigned_laser_index", &self.assigned_laser_index)
            .field("card", &self.card)
            .finish_non_exhaustive()
    }
}

impl CardSession {
    /// Validate `config` and connect the card it describes.
    ///
    /// In simulation mode no device is contacted and `sdk` may be `None`.
    ///
    /// # Errors
    ///
    /// - Validation errors from [`CardConfig::validate`]
    /// - `Error::SdkNotLoaded` outside simulation mode without an SDK
    /// - `Error::Device` if the connection fails
    pub fn connect(
        config: &CardConfig,
        sdk: Option<&Sdk>,
        clock: Arc<dyn Clock>,
        simulation_mode: bool,
    ) -> Result<Self> {
        config.validate()?;

        let card = if simulation_mode {
            AnyCard::Simulated(SimulatedCard::new()?)
        } else {
            let sdk = sdk.ok_or(Error::SdkNotLoaded)?;
            AnyCard::Real(RealCard::connect(sdk.clone(), &config.ip, config.port)?)
        };

        info!(
            name = %config.name,
            ip = %config.ip,
            port = config.port,
            simulated = simulation_mode,
            "Card session opened"
        );

        Ok(Self {
            name: config.name.clone(),
            ip: config.ip.clone(),
            port: config.port,
            max_laser_power_watts: config.max_laser_power_watts,
            assigned_laser_index: config.laser_index,
            transform: config.coordinate_transform(),
            card,
            clock,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    pub fn max_laser_power_watts(&self) -> f64 {
        self.max_laser_power_watts
    }

    pub fn is_simulation_mode(&self) -> bool {
        self.card.is_simulated()
    }

    pub fn card(&self) -> &AnyCard {
        &self.card
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Simulated sessions are always connected.
    pub fn is_connected(&self) -> bool {
        self.card.is_connected()
    }

    /// Abort any running list and close the connection.
    pub fn disconnect(&mut self) -> Result<()> {
        self.card.disconnect()
    }

    pub fn reset_to_system_defaults(&mut self) -> Result<()> {
        self.card.reset_to_system_defaults()
    }

    pub fn laser_on(&mut self) -> Result<()> {
        self.card.laser_on()
    }

    pub fn laser_off(&mut self) -> Result<()> {
        self.card.laser_off()
    }

    pub fn arm_laser(&mut self, armed: bool) -> Result<()> {
        self.card.arm_laser(armed)
    }

    pub fn is_laser_armed(&self) -> Result<bool> {
        self.card.is_laser_armed()
    }

    pub fn enable_pilot(&mut self, enabled: bool) -> Result<()> {
        self.card.enable_pilot(enabled)
    }

    pub fn is_pilot_enabled(&self) -> Result<bool> {
        self.card.is_pilot_enabled()
    }

    pub fn laser_status(&self) -> Result<LaserStatus> {
        self.card.laser_status()
    }

    pub fn read_laser_config(&self) -> Result<LaserConfig> {
        self.card.read_laser_config()
    }

    pub fn write_laser_config(&mut self, config: &LaserConfig) -> Result<()> {
        self.card.write_laser_config(config)
    }

    /// Returns the log file path; `None` for simulated cards.
    pub fn enable_command_logging(&mut self, directory: &Path) -> Result<Option<PathBuf>> {
        self.card.enable_command_logging(directory)
    }

    pub fn disable_command_logging(&mut self) -> Result<()> {
        self.card.disable_command_logging()
    }

    /// Set the laser this card draws in multi-laser layers. 0 unassigns.
    pub fn assign_laser_index(&mut self, laser_index: u32) {
        debug!(name = %self.name, laser_index, "Assigned laser index");
        self.assigned_laser_index = laser_index;
    }

    pub fn assigned_laser_index(&self) -> u32 {
        self.assigned_laser_index
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Calibration applied to lists created from now on.
    pub fn transform_mut(&mut self) -> &mut CoordinateTransform {
        &mut self.transform
    }

    /// Allocate an empty list using this card's power limit and transform.
    pub fn create_list(&self) -> Result<ScanList> {
        self.card
            .create_list(self.max_laser_power_watts, self.transform)
    }

    pub fn abort_list_execution_if_in_progress(&mut self) -> Result<bool> {
        self.card.abort_list_execution_if_in_progress()
    }

    /// The nLight board attached to this card's output port.
    pub fn nlight(&mut self) -> NLightBoard<'_> {
        NLightBoard::new(&mut self.card, self.clock.as_ref())
    }

    /// Draw every segment of `layer` and block until the card is done.
    ///
    /// The list is placed in slot 0. On any failure after allocation the
    /// running list is aborted and the slot deleted before the error is
    /// returned. Simulated sessions return immediately.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidSystemTiming` if the clock goes backwards
    /// - `Error::ScanningTimeout` if drawing takes longer than `timeout_ms`
    /// - Toolpath, point count and device errors from building and running the list
    pub fn draw_layer(&mut self, layer: &dyn ToolpathLayer, timeout_ms: u64) -> Result<()> {
        if self.is_simulation_mode() {
            debug!(name = %self.name, "Simulated draw, skipping device");
            return Ok(());
        }

        let start_ms = self.clock.now_ms();
        let mut execution = ExecutionController::new(self.create_list()?);
        execution.add_layer(layer, 0, false)?;
        execution.set_list_on_card(DEFAULT_LIST_ID)?;
        execution.execute_list(DEFAULT_LIST_ID)?;

        wait_for_completion(
            std::slice::from_mut(&mut execution),
            self.clock.as_ref(),
            start_ms,
            timeout_ms,
        )?;

        info!(
            name = %self.name,
            commands = execution.list().command_count(),
            elapsed_ms = self.clock.now_ms().saturating_sub(start_ms),
            "Layer drawn"
        );
        execution.finish()
    }
}

impl Drop for CardSession {
    fn drop(&mut self) {
        if let Err(e) = self.card.disconnect() {
            warn!(name = %self.name, error = %e, "Disconnect on drop failed");
        }
    }
}
