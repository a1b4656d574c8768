//! Multi-card driver.
//!
//! [`LaserCardDriver`] keeps a registry of named [`CardSession`]s and draws
//! layers across all of them at once, each card picking out the segments
//! tagged with its laser index.
//!
//! ```text
//!                       ┌──────────────┐
//!   layer ─────────────►│ laser index  │
//!                       │   filter     │
//!                       └──────┬───────┘
//!            ┌─────────────────┼─────────────────┐
//!            ▼                 ▼                 ▼
//!      ┌───────────┐     ┌───────────┐     ┌───────────┐
//!      │ card "a"  │     │ card "b"  │     │ card "c"  │
//!      │ index 1   │     │ index 2   │     │ index 3   │
//!      └───────────┘     └───────────┘     └───────────┘
//!            └────────── polled in order ────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use lasercard_driver::{LaserCardDriver, LayerData};
//!
//! let mut driver = LaserCardDriver::new("scanner");
//! driver.set_to_simulation_mode();
//!
//! let card = driver.connect_by_ip("left", "192.168.1.10", 2000, 400.0)?;
//! card.assign_laser_index(1);
//!
//! driver.draw_layer_multi_laser(&LayerData::new(1.0), true, 10_000)?;
//! assert!(driver.card_exists("left")?);
//! # Ok::<(), lasercard_core::Error>(())
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use lasercard_core::constants::DEFAULT_LIST_ID;
use lasercard_core::{Error, Result};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::{CardConfig, DriverConfig};
use crate::execution::{ExecutionController, wait_for_completion};
use crate::sdk::Sdk;
use crate::session::CardSession;
use crate::toolpath::ToolpathLayer;

/// Driver type reported by [`LaserCardDriver::driver_type`].
pub const DRIVER_TYPE: &str = "raylase";

/// Registry of connected cards.
pub struct LaserCardDriver {
    name: String,
    sdk: Option<Sdk>,
    clock: Arc<dyn Clock>,
    simulation_mode: bool,
    cards: BTreeMap<String, CardSession>,
}

impl std::fmt::Debug for LaserCardDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaserCardDriver")
            .field("name", &self.name)
            .field("sdk_loaded", &self.sdk.is_some())
            .field("simulation_mode", &self.simulation_mode)
            .field("cards", &self.cards.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LaserCardDriver {
    pub fn new(name: &str) -> Self {
        Self::with_clock(name, Arc::new(SystemClock))
    }

    pub fn with_clock(name: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.to_string(),
            sdk: None,
            clock,
            simulation_mode: false,
            cards: BTreeMap::new(),
        }
    }

    /// Build a driver from `config` and connect every configured card.
    ///
    /// Stops at the first card that fails to connect; cards connected
    /// before it are disconnected when the partial driver is dropped.
    pub fn from_config(config: &DriverConfig, sdk: Option<Sdk>, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut driver = Self::with_clock(&config.name, clock);
        if let Some(sdk) = sdk {
            driver.load_sdk(sdk);
        }
        if config.simulation_mode {
            driver.set_to_simulation_mode();
        }

        for card in &config.cards {
            driver.connect(card)?;
        }
        Ok(driver)
    }

    /// Install the SDK used for every card connected afterwards.
    pub fn load_sdk(&mut self, sdk: Sdk) {
        debug!(name = %self.name, "Scanner SDK loaded");
        self.sdk = Some(sdk);
    }

    pub fn is_sdk_loaded(&self) -> bool {
        self.sdk.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver_type(&self) -> &'static str {
        DRIVER_TYPE
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Cards connected from now on are simulated.
    pub fn set_to_simulation_mode(&mut self) {
        info!(name = %self.name, "Switching to simulation mode");
        self.simulation_mode = true;
    }

    pub fn is_simulation_mode(&self) -> bool {
        self.simulation_mode
    }

    /// Connect a card and register it under `name`.
    ///
    /// # Errors
    ///
    /// - `Error::SdkNotLoaded` outside simulation mode without an SDK
    /// - Name, address, port and power validation errors
    /// - `Error::CardAlreadyRegistered` if `name` is taken
    /// - `Error::Device` if the connection fails
    pub fn connect_by_ip(
        &mut self,
        name: &str,
        ip: &str,
        port: u32,
        max_laser_power_watts: f64,
    ) -> Result<&mut CardSession> {
        self.connect(&CardConfig::new(name, ip, port, max_laser_power_watts))
    }

    /// Connect a card with the full settings of `config`.
    pub fn connect(&mut self, config: &CardConfig) -> Result<&mut CardSession> {
        if !self.simulation_mode && self.sdk.is_none() {
            return Err(Error::SdkNotLoaded);
        }
        config.validate()?;
        if self.cards.contains_key(&config.name) {
            return Err(Error::CardAlreadyRegistered(config.name.clone()));
        }

        let session = CardSession::connect(
            config,
            self.sdk.as_ref(),
            self.clock.clone(),
            self.simulation_mode,
        )?;
        Ok(self.cards.entry(config.name.clone()).or_insert(session))
    }

    pub fn get_connected_card(&self, name: &str) -> Result<&CardSession> {
        check_card_name(name)?;
        self.cards
            .get(name)
            .ok_or_else(|| Error::CardNotRegistered(name.to_string()))
    }

    pub fn get_connected_card_mut(&mut self, name: &str) -> Result<&mut CardSession> {
        check_card_name(name)?;
        self.cards
            .get_mut(name)
            .ok_or_else(|| Error::CardNotRegistered(name.to_string()))
    }

    pub fn card_exists(&self, name: &str) -> Result<bool> {
        check_card_name(name)?;
        Ok(self.cards.contains_key(name))
    }

    /// Registered card names in order.
    pub fn card_names(&self) -> impl Iterator<Item = &str> {
        self.cards.keys().map(String::as_str)
    }

    /// Unregister and disconnect a card. Unknown names are ignored.
    pub fn disconnect_card(&mut self, name: &str) -> Result<()> {
        check_card_name(name)?;
        if let Some(mut session) = self.cards.remove(name) {
            session.disconnect()?;
            info!(name, "Card disconnected");
        }
        Ok(())
    }

    /// Draw `layer` on every card with an assigned laser index.
    ///
    /// Each card receives only the segments whose laser index matches its
    /// own. All lists are started before any is polled, and all are
    /// cleaned up if any card fails. Does nothing in simulation mode.
    ///
    /// # Errors
    ///
    /// - `Error::AssignedDuplicateLaserIndex` if two cards share an index
    /// - `Error::NoLaserIndicesAssigned` if no card has an index
    /// - `Error::SegmentHasNoAssignedCard` if `fail_if_unassigned` is set
    ///   and a segment has no laser index
    /// - Timing and device errors as for [`CardSession::draw_layer`]
    pub fn draw_layer_multi_laser(
        &mut self,
        layer: &dyn ToolpathLayer,
        fail_if_unassigned: bool,
        timeout_ms: u64,
    ) -> Result<()> {
        if self.simulation_mode {
            debug!(name = %self.name, "Simulated multi-laser draw, skipping devices");
            return Ok(());
        }

        let laser_map = self.laser_map()?;

        let start_ms = self.clock.now_ms();
        let mut executions = Vec::with_capacity(laser_map.len());
        for (&laser_index, session) in &laser_map {
            let mut execution = ExecutionController::new(session.create_list()?);
            execution.add_layer(layer, laser_index, fail_if_unassigned)?;
            execution.set_list_on_card(DEFAULT_LIST_ID)?;
            execution.execute_list(DEFAULT_LIST_ID)?;
            debug!(card = %session.name(), laser_index, "List started");
            executions.push(execution);
        }

        wait_for_completion(&mut executions, self.clock.as_ref(), start_ms, timeout_ms)?;

        for execution in executions {
            execution.finish()?;
        }
        info!(
            cards = laser_map.len(),
            elapsed_ms = self.clock.now_ms().saturating_sub(start_ms),
            "Multi-laser layer drawn"
        );
        Ok(())
    }

    /// Cards keyed by their assigned laser index.
    fn laser_map(&self) -> Result<BTreeMap<u32, &CardSession>> {
        let mut laser_map: BTreeMap<u32, &CardSession> = BTreeMap::new();
        for session in self.cards.values() {
            let laser_index = session.assigned_laser_index();
            if laser_index == 0 {
                continue;
            }
            if let Some(existing) = laser_map.get(&laser_index) {
                return Err(Error::AssignedDuplicateLaserIndex {
                    laser_index,
                    card: session.name().to_string(),
                    existing: existing.name().to_string(),
                });
            }
            laser_map.insert(laser_index, session);
        }

        if laser_map.is_empty() {
            return Err(Error::NoLaserIndicesAssigned);
        }
        Ok(laser_map)
    }
}

fn check_card_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidCardName);
    }
    Ok(())
}
