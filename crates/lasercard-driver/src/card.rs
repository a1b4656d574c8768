//! Card backends.
//!
//! [`ScanCard`] is the device-facing half of a card session. [`RealCard`]
//! forwards every operation to the SDK; [`SimulatedCard`] keeps the laser
//! safety bits in memory and never touches hardware, while keeping the same
//! success and failure shape.

use std::path::{Path, PathBuf};

use lasercard_core::{CardHandle, CoordinateTransform, GpioAction, LaserStatus, Result};
use lasercard_schema::LaserConfig;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::list::{ScanList, abort_execution_if_in_progress};
use crate::sdk::Sdk;

/// Maximum number of lines the card writes to a command log; -1 is unbounded.
const COMMAND_LOG_UNBOUNDED: i32 = -1;

/// Operations a connected card supports.
pub trait ScanCard {
    fn is_simulated(&self) -> bool;

    fn is_connected(&self) -> bool;

    /// Abort any running list and drop the connection.
    fn disconnect(&mut self) -> Result<()>;

    fn reset_to_system_defaults(&mut self) -> Result<()>;

    fn laser_on(&mut self) -> Result<()>;

    fn laser_off(&mut self) -> Result<()>;

    fn arm_laser(&mut self, armed: bool) -> Result<()>;

    fn is_laser_armed(&self) -> Result<bool>;

    fn enable_pilot(&mut self, enabled: bool) -> Result<()>;

    fn is_pilot_enabled(&self) -> Result<bool>;

    fn laser_status(&self) -> Result<LaserStatus>;

    fn read_laser_config(&self) -> Result<LaserConfig>;

    fn write_laser_config(&mut self, config: &LaserConfig) -> Result<()>;

    /// Start logging all card commands to a new file in `directory`.
    ///
    /// Returns the log file path, or `None` if the card does not log.
    fn enable_command_logging(&mut self, directory: &Path) -> Result<Option<PathBuf>>;

    fn disable_command_logging(&mut self) -> Result<()>;

    fn gpio_write(&mut self, port: u32, action: GpioAction, mask: u32) -> Result<()>;

    /// Abort a running list. Returns whether an abort was issued.
    fn abort_list_execution_if_in_progress(&mut self) -> Result<bool>;

    fn create_list(&self, max_laser_power_watts: f64, transform: CoordinateTransform) -> Result<ScanList>;
}

/// Card reached through the vendor SDK.
#[derive(Debug)]
pub struct RealCard {
    sdk: Sdk,
    handle: CardHandle,
    logging_file: Option<PathBuf>,
}

impl RealCard {
    /// Open a connection to the card at `ip:port`.
    pub fn connect(sdk: Sdk, ip: &str, port: u32) -> Result<Self> {
        let handle = sdk.call("rlConnect", |raw| raw.connect(ip, port))?;
        info!(ip, port, %handle, "Connected to card");

        Ok(Self {
            sdk,
            handle,
            logging_file: None,
        })
    }

    pub fn handle(&self) -> CardHandle {
        self.handle
    }
}

impl ScanCard for RealCard {
    fn is_simulated(&self) -> bool {
        false
    }

    fn is_connected(&self) -> bool {
        self.handle.is_valid()
    }

    fn disconnect(&mut self) -> Result<()> {
        if !self.handle.is_valid() {
            return Ok(());
        }

        let handle = self.handle;
        self.handle = CardHandle::DISCONNECTED;

        if let Err(e) = abort_execution_if_in_progress(&self.sdk, handle) {
            warn!(%handle, error = %e, "Could not abort execution before disconnect");
        }
        self.sdk.call("rlDisconnect", |raw| raw.disconnect(handle))?;
        info!(%handle, "Disconnected from card");
        Ok(())
    }

    fn reset_to_system_defaults(&mut self) -> Result<()> {
        let handle = self.handle;
        self.sdk.call("rlSystemResetToDefaults", |raw| {
            raw.system_reset_to_defaults(handle)
        })
    }

    fn laser_on(&mut self) -> Result<()> {
        let handle = self.handle;
        self.sdk.call("rlLaserLaserOn", |raw| raw.laser_on(handle))
    }

    fn laser_off(&mut self) -> Result<()> {
        let handle = self.handle;
        self.sdk.call("rlLaserLaserOff", |raw| raw.laser_off(handle))
    }

    fn arm_laser(&mut self, armed: bool) -> Result<()> {
        let handle = self.handle;
        self.sdk
            .call("rlLaserArmLaser", |raw| raw.arm_laser(handle, armed))
    }

    fn is_laser_armed(&self) -> Result<bool> {
        let handle = self.handle;
        self.sdk
            .call("rlLaserIsLaserArmed", |raw| raw.is_laser_armed(handle))
    }

    fn enable_pilot(&mut self, enabled: bool) -> Result<()> {
        let handle = self.handle;
        self.sdk
            .call("rlLaserEnablePilot", |raw| raw.enable_pilot(handle, enabled))
    }

    fn is_pilot_enabled(&self) -> Result<bool> {
        let handle = self.handle;
        self.sdk
            .call("rlLaserIsPilotEnabled", |raw| raw.is_pilot_enabled(handle))
    }

    fn laser_status(&self) -> Result<LaserStatus> {
        let handle = self.handle;
        let bits = self
            .sdk
            .call("rlLaserReadLaserStatus", |raw| raw.read_laser_status(handle))?;
        Ok(LaserStatus::from_bits(bits))
    }

    fn read_laser_config(&self) -> Result<LaserConfig> {
        let handle = self.handle;
        let mut config = LaserConfig::new()?;
        self.sdk.call("rlLaserGetConfig", |raw| {
            raw.laser_get_config(handle, config.data_mut())
        })?;
        Ok(config)
    }

    fn write_laser_config(&mut self, config: &LaserConfig) -> Result<()> {
        let handle = self.handle;
        self.sdk.call("rlLaserSetConfig", |raw| {
            raw.laser_set_config(handle, config.data())
        })
    }

    fn enable_command_logging(&mut self, directory: &Path) -> Result<Option<PathBuf>> {
        let path = directory.join(format!("command_logging_{}", Uuid::new_v4()));
        let handle = self.handle;
        self.sdk.call("rlEnableCommandLogging", |raw| {
            raw.enable_command_logging(handle, &path, COMMAND_LOG_UNBOUNDED)
        })?;

        info!(%handle, path = %path.display(), "Command logging enabled");
        self.logging_file = Some(path.clone());
        Ok(Some(path))
    }

    fn disable_command_logging(&mut self) -> Result<()> {
        let handle = self.handle;
        self.sdk.call("rlDisableCommandLogging", |raw| {
            raw.disable_command_logging(handle)
        })?;
        self.logging_file = None;
        Ok(())
    }

    fn gpio_write(&mut self, port: u32, action: GpioAction, mask: u32) -> Result<()> {
        let handle = self.handle;
        self.sdk.call("rlGpioWrite", |raw| {
            raw.gpio_write(handle, port, action, mask)
        })
    }

    fn abort_list_execution_if_in_progress(&mut self) -> Result<bool> {
        abort_execution_if_in_progress(&self.sdk, self.handle)
    }

    fn create_list(&self, max_laser_power_watts: f64, transform: CoordinateTransform) -> Result<ScanList> {
        ScanList::allocate(self.sdk.clone(), self.handle, max_laser_power_watts, transform)
    }
}

/// Card stand-in with in-memory laser state.
#[derive(Debug)]
pub struct SimulatedCard {
    sdk: Sdk,
    status: LaserStatus,
    laser_config: LaserConfig,
}

impl SimulatedCard {
    pub fn new() -> Result<Self> {
        debug!("Created simulated card");
        Ok(Self {
            sdk: Sdk::null(),
            status: LaserStatus::default(),
            laser_config: LaserConfig::new()?,
        })
    }

    /// Raise or clear the simulated laser alarm.
    pub fn set_alarm(&mut self, alarm: bool) {
        self.status.alarm = alarm;
    }
}

impl ScanCard for SimulatedCard {
    fn is_simulated(&self) -> bool {
        true
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }

    fn reset_to_system_defaults(&mut self) -> Result<()> {
        Ok(())
    }

    fn laser_on(&mut self) -> Result<()> {
        Ok(())
    }

    fn laser_off(&mut self) -> Result<()> {
        Ok(())
    }

    fn arm_laser(&mut self, armed: bool) -> Result<()> {
        self.status.laser_armed = armed;
        Ok(())
    }

    fn is_laser_armed(&self) -> Result<bool> {
        Ok(self.status.laser_armed)
    }

    fn enable_pilot(&mut self, enabled: bool) -> Result<()> {
        self.status.pilot_enabled = enabled;
        Ok(())
    }

    fn is_pilot_enabled(&self) -> Result<bool> {
        Ok(self.status.pilot_enabled)
    }

    fn laser_status(&self) -> Result<LaserStatus> {
        Ok(self.status)
    }

    fn read_laser_config(&self) -> Result<LaserConfig> {
        Ok(self.laser_config.clone())
    }

    fn write_laser_config(&mut self, config: &LaserConfig) -> Result<()> {
        self.laser_config = config.clone();
        Ok(())
    }

    fn enable_command_logging(&mut self, _directory: &Path) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    fn disable_command_logging(&mut self) -> Result<()> {
        Ok(())
    }

    fn gpio_write(&mut self, _port: u32, _action: GpioAction, _mask: u32) -> Result<()> {
        Ok(())
    }

    fn abort_list_execution_if_in_progress(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn create_list(&self, max_laser_power_watts: f64, transform: CoordinateTransform) -> Result<ScanList> {
        ScanList::allocate(
            self.sdk.clone(),
            CardHandle::DISCONNECTED,
            max_laser_power_watts,
            transform,
        )
    }
}
