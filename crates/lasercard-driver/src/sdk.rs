//! Vendor SDK capability.
//!
//! [`ScannerSdk`] is the raw function table of the scanner client library:
//! every entry point returns `Ok` on a zero status and `Err(status)`
//! otherwise. Loading the library is the implementor's business; a value of
//! this trait is always fully usable.
//!
//! [`Sdk`] wraps the raw table in a cheap, cloneable handle and converts
//! failing statuses into [`Error::Device`] using the SDK's two-call
//! last-error retrieval.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use lasercard_core::{CardHandle, Error, GpioAction, ListHandle, Result};
use tracing::trace;

/// Raw SDK call outcome; `Err` carries the nonzero vendor status.
pub type RawResult<T> = std::result::Result<T, i32>;

/// Raw entry points of the scanner client library.
pub trait ScannerSdk: Send + Sync {
    // Connection
    fn connect(&self, ip: &str, port: u32) -> RawResult<CardHandle>;
    fn disconnect(&self, card: CardHandle) -> RawResult<()>;
    fn system_reset_to_defaults(&self, card: CardHandle) -> RawResult<()>;
    fn enable_command_logging(&self, card: CardHandle, path: &Path, max_lines: i32) -> RawResult<()>;
    fn disable_command_logging(&self, card: CardHandle) -> RawResult<()>;

    // Laser
    fn laser_on(&self, card: CardHandle) -> RawResult<()>;
    fn laser_off(&self, card: CardHandle) -> RawResult<()>;
    fn arm_laser(&self, card: CardHandle, armed: bool) -> RawResult<()>;
    fn is_laser_armed(&self, card: CardHandle) -> RawResult<bool>;
    fn enable_pilot(&self, card: CardHandle, enabled: bool) -> RawResult<()>;
    fn is_pilot_enabled(&self, card: CardHandle) -> RawResult<bool>;
    fn read_laser_status(&self, card: CardHandle) -> RawResult<u32>;
    fn laser_get_config(&self, card: CardHandle, buffer: &mut [u8]) -> RawResult<()>;
    fn laser_set_config(&self, card: CardHandle, buffer: &[u8]) -> RawResult<()>;

    // Lists
    fn list_allocate(&self, card: CardHandle) -> RawResult<ListHandle>;
    fn list_release_handle(&self, list: ListHandle) -> RawResult<()>;
    fn list_append_laser_on(&self, list: ListHandle) -> RawResult<()>;
    fn list_append_laser_off(&self, list: ListHandle) -> RawResult<()>;
    fn list_append_power(&self, list: ListHandle, units: u16) -> RawResult<()>;
    fn list_append_jump_speed(&self, list: ListHandle, meters_per_second: f64) -> RawResult<()>;
    fn list_append_mark_speed(&self, list: ListHandle, meters_per_second: f64) -> RawResult<()>;
    fn list_append_jump_abs_2d(&self, list: ListHandle, x: f64, y: f64) -> RawResult<()>;
    fn list_append_mark_abs_2d(&self, list: ListHandle, x: f64, y: f64) -> RawResult<()>;
    fn list_set(
        &self,
        card: CardHandle,
        list_id: u32,
        list: ListHandle,
        append: bool,
        execution_limit: i32,
    ) -> RawResult<()>;
    fn list_execute(&self, card: CardHandle, list_id: u32) -> RawResult<()>;
    /// Block up to `timeout_ms`; returns `(done, list_id)`.
    fn list_wait_for_list_done(&self, card: CardHandle, timeout_ms: u32) -> RawResult<(bool, i32)>;
    fn list_delete(&self, card: CardHandle, list_id: u32, from_disk: bool) -> RawResult<()>;
    fn list_is_execution_in_progress(&self, card: CardHandle) -> RawResult<bool>;
    fn list_abort_execution(&self, card: CardHandle) -> RawResult<()>;

    // Digital I/O
    fn gpio_write(&self, card: CardHandle, port: u32, action: GpioAction, mask: u32) -> RawResult<()>;

    // Error retrieval
    fn last_error_length(&self) -> usize;
    fn last_error(&self, buffer: &mut [u8]) -> RawResult<()>;
}

/// Shared handle to a loaded SDK with status checking.
#[derive(Clone)]
pub struct Sdk {
    inner: Arc<dyn ScannerSdk>,
}

impl Sdk {
    pub fn new(inner: Arc<dyn ScannerSdk>) -> Self {
        Self { inner }
    }

    /// An SDK that accepts every call without touching hardware.
    pub fn null() -> Self {
        Self::new(Arc::new(NullSdk::default()))
    }

    /// Invoke a raw entry point and decode a failing status.
    ///
    /// `tag` names the call and ends up in the error message.
    pub fn call<T>(&self, tag: &str, f: impl FnOnce(&dyn ScannerSdk) -> RawResult<T>) -> Result<T> {
        trace!(call = tag, "SDK call");
        f(self.inner.as_ref()).map_err(|status| self.decode_error(status, tag))
    }

    /// Build a device error from a status and the SDK's last error text.
    pub fn decode_error(&self, status: i32, tag: &str) -> Error {
        let length = self.inner.last_error_length();
        let mut message = if length > 0 {
            let mut buffer = vec![0u8; length + 1];
            match self.inner.last_error(&mut buffer) {
                Ok(()) => {
                    let end = buffer.iter().position(|b| *b == 0).unwrap_or(length);
                    String::from_utf8_lossy(&buffer[..end]).into_owned()
                }
                Err(_) => "<unknown error>".to_string(),
            }
        } else {
            "<unknown error>".to_string()
        };

        if !tag.is_empty() {
            message.push_str(" - ");
            message.push_str(tag);
        }
        Error::device(status, message)
    }
}

impl fmt::Debug for Sdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sdk").finish_non_exhaustive()
    }
}

/// SDK stand-in for simulated cards.
///
/// Every call succeeds; lists report done on the first poll.
#[derive(Debug, Default)]
pub struct NullSdk {
    next_list: AtomicI64,
}

impl ScannerSdk for NullSdk {
    fn connect(&self, _ip: &str, _port: u32) -> RawResult<CardHandle> {
        Ok(CardHandle(1))
    }

    fn disconnect(&self, _card: CardHandle) -> RawResult<()> {
        Ok(())
    }

    fn system_reset_to_defaults(&self, _card: CardHandle) -> RawResult<()> {
        Ok(())
    }

    fn enable_command_logging(&self, _card: CardHandle, _path: &Path, _max_lines: i32) -> RawResult<()> {
        Ok(())
    }

    fn disable_command_logging(&self, _card: CardHandle) -> RawResult<()> {
        Ok(())
    }

    fn laser_on(&self, _card: CardHandle) -> RawResult<()> {
        Ok(())
    }

    fn laser_off(&self, _card: CardHandle) -> RawResult<()> {
        Ok(())
    }

    fn arm_laser(&self, _card: CardHandle, _armed: bool) -> RawResult<()> {
        Ok(())
    }

    fn is_laser_armed(&self, _card: CardHandle) -> RawResult<bool> {
        Ok(false)
    }

    fn enable_pilot(&self, _card: CardHandle, _enabled: bool) -> RawResult<()> {
        Ok(())
    }

    fn is_pilot_enabled(&self, _card: CardHandle) -> RawResult<bool> {
        Ok(false)
    }

    fn read_laser_status(&self, _card: CardHandle) -> RawResult<u32> {
        Ok(0)
    }

    fn laser_get_config(&self, _card: CardHandle, _buffer: &mut [u8]) -> RawResult<()> {
        Ok(())
    }

    fn laser_set_config(&self, _card: CardHandle, _buffer: &[u8]) -> RawResult<()> {
        Ok(())
    }

    fn list_allocate(&self, _card: CardHandle) -> RawResult<ListHandle> {
        Ok(ListHandle(self.next_list.fetch_add(1, Ordering::Relaxed) + 1))
    }

    fn list_release_handle(&self, _list: ListHandle) -> RawResult<()> {
        Ok(())
    }

    fn list_append_laser_on(&self, _list: ListHandle) -> RawResult<()> {
        Ok(())
    }

    fn list_append_laser_off(&self, _list: ListHandle) -> RawResult<()> {
        Ok(())
    }

    fn list_append_power(&self, _list: ListHandle, _units: u16) -> RawResult<()> {
        Ok(())
    }

    fn list_append_jump_speed(&self, _list: ListHandle, _meters_per_second: f64) -> RawResult<()> {
        Ok(())
    }

    fn list_append_mark_speed(&self, _list: ListHandle, _meters_per_second: f64) -> RawResult<()> {
        Ok(())
    }

    fn list_append_jump_abs_2d(&self, _list: ListHandle, _x: f64, _y: f64) -> RawResult<()> {
        Ok(())
    }

    fn list_append_mark_abs_2d(&self, _list: ListHandle, _x: f64, _y: f64) -> RawResult<()> {
        Ok(())
    }

    fn list_set(
        &self,
        _card: CardHandle,
        _list_id: u32,
        _list: ListHandle,
        _append: bool,
        _execution_limit: i32,
    ) -> RawResult<()> {
        Ok(())
    }

    fn list_execute(&self, _card: CardHandle, _list_id: u32) -> RawResult<()> {
        Ok(())
    }

    fn list_wait_for_list_done(&self, _card: CardHandle, _timeout_ms: u32) -> RawResult<(bool, i32)> {
        Ok((true, 0))
    }

    fn list_delete(&self, _card: CardHandle, _list_id: u32, _from_disk: bool) -> RawResult<()> {
        Ok(())
    }

    fn list_is_execution_in_progress(&self, _card: CardHandle) -> RawResult<bool> {
        Ok(false)
    }

    fn list_abort_execution(&self, _card: CardHandle) -> RawResult<()> {
        Ok(())
    }

    fn gpio_write(&self, _card: CardHandle, _port: u32, _action: GpioAction, _mask: u32) -> RawResult<()> {
        Ok(())
    }

    fn last_error_length(&self) -> usize {
        0
    }

    fn last_error(&self, _buffer: &mut [u8]) -> RawResult<()> {
        Ok(())
    }
}
