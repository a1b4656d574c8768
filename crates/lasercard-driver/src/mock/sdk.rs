//! Recording SDK for tests and command previews.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lasercard_core::{CardHandle, GpioAction, ListHandle};

use crate::command::ScanCommand;
use crate::sdk::{RawResult, ScannerSdk};

/// In-memory scanner SDK.
///
/// Every call is recorded by method name. Lists keep the commands appended
/// to them, GPIO writes are kept in order, and failures can be scripted per
/// method.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lasercard_driver::mock::MockSdk;
/// use lasercard_driver::{ScannerSdk, Sdk};
///
/// let mock = Arc::new(MockSdk::new());
/// let sdk = Sdk::new(mock.clone());
///
/// mock.fail_next("laser_on", -2, "interlock open");
/// let card = sdk.call("rlConnect", |raw| raw.connect("192.168.1.10", 2000)).unwrap();
/// assert!(sdk.call("rlLaserLaserOn", |raw| raw.laser_on(card)).is_err());
/// assert_eq!(mock.call_count("laser_on"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockSdk {
    state: Mutex<MockState>,
}

#[derive(Debug)]
struct MockState {
    calls: Vec<String>,
    failures: HashMap<String, (i32, String)>,
    last_error: String,
    next_card: i32,
    next_list: i64,
    lists: HashMap<ListHandle, Vec<ScanCommand>>,
    released: Vec<ListHandle>,
    slots: BTreeMap<(CardHandle, u32), ListHandle>,
    executed: Vec<(CardHandle, u32)>,
    gpio_writes: Vec<(GpioAction, u32)>,
    in_progress: bool,
    polls_until_done: Option<u32>,
    armed: bool,
    pilot: bool,
    status_bits: u32,
    laser_config: Vec<u8>,
    logging_path: Option<PathBuf>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            failures: HashMap::new(),
            last_error: String::new(),
            next_card: 1,
            next_list: 1,
            lists: HashMap::new(),
            released: Vec::new(),
            slots: BTreeMap::new(),
            executed: Vec::new(),
            gpio_writes: Vec::new(),
            in_progress: false,
            polls_until_done: Some(0),
            armed: false,
            pilot: false,
            status_bits: 0,
            laser_config: Vec::new(),
            logging_path: None,
        }
    }
}

impl MockSdk {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call and apply any scripted failure for it.
    fn enter(&self, name: &str) -> RawResult<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.calls.push(name.to_string());
        if let Some((status, message)) = state.failures.remove(name) {
            state.last_error = message;
            return Err(status);
        }
        Ok(state)
    }

    fn append(&self, name: &str, list: ListHandle, command: ScanCommand) -> RawResult<()> {
        let mut state = self.enter(name)?;
        state.lists.entry(list).or_default().push(command);
        Ok(())
    }

    /// Make the next call of `method` fail with `status` and `message`.
    pub fn fail_next(&self, method: &str, status: i32, message: &str) {
        self.lock()
            .failures
            .insert(method.to_string(), (status, message.to_string()));
    }

    /// Number of polls reporting "not done" before a list finishes.
    pub fn set_polls_until_done(&self, polls: u32) {
        self.lock().polls_until_done = Some(polls);
    }

    /// Lists never finish executing.
    pub fn never_finish(&self) {
        self.lock().polls_until_done = None;
    }

    pub fn set_execution_in_progress(&self, in_progress: bool) {
        self.lock().in_progress = in_progress;
    }

    pub fn set_laser_status_bits(&self, bits: u32) {
        self.lock().status_bits = bits;
    }

    /// All recorded method names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.lock().calls.iter().filter(|call| *call == method).count()
    }

    /// Recorded calls, excluding error retrieval.
    pub fn device_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call != "last_error_length" && call != "last_error")
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn commands(&self, list: ListHandle) -> Vec<ScanCommand> {
        self.lock().lists.get(&list).cloned().unwrap_or_default()
    }

    /// Commands of the list most recently placed into any slot of `card`.
    pub fn commands_in_slot(&self, card: CardHandle, list_id: u32) -> Option<Vec<ScanCommand>> {
        let state = self.lock();
        let list = state.slots.get(&(card, list_id))?;
        Some(state.lists.get(list).cloned().unwrap_or_default())
    }

    pub fn occupied_slots(&self) -> Vec<(CardHandle, u32)> {
        self.lock().slots.keys().copied().collect()
    }

    pub fn executed(&self) -> Vec<(CardHandle, u32)> {
        self.lock().executed.clone()
    }

    pub fn released_lists(&self) -> Vec<ListHandle> {
        self.lock().released.clone()
    }

    pub fn gpio_writes(&self) -> Vec<(GpioAction, u32)> {
        self.lock().gpio_writes.clone()
    }

    pub fn logging_path(&self) -> Option<PathBuf> {
        self.lock().logging_path.clone()
    }
}

impl ScannerSdk for MockSdk {
    fn connect(&self, _ip: &str, _port: u32) -> RawResult<CardHandle> {
        let mut state = self.enter("connect")?;
        let handle = CardHandle(state.next_card);
        state.next_card += 1;
        Ok(handle)
    }

    fn disconnect(&self, _card: CardHandle) -> RawResult<()> {
        self.enter("disconnect").map(drop)
    }

    fn system_reset_to_defaults(&self, _card: CardHandle) -> RawResult<()> {
        self.enter("system_reset_to_defaults").map(drop)
    }

    fn enable_command_logging(&self, _card: CardHandle, path: &Path, _max_lines: i32) -> RawResult<()> {
        let mut state = self.enter("enable_command_logging")?;
        state.logging_path = Some(path.to_path_buf());
        Ok(())
    }

    fn disable_command_logging(&self, _card: CardHandle) -> RawResult<()> {
        let mut state = self.enter("disable_command_logging")?;
        state.logging_path = None;
        Ok(())
    }

    fn laser_on(&self, _card: CardHandle) -> RawResult<()> {
        self.enter("laser_on").map(drop)
    }

    fn laser_off(&self, _card: CardHandle) -> RawResult<()> {
        self.enter("laser_off").map(drop)
    }

    fn arm_laser(&self, _card: CardHandle, armed: bool) -> RawResult<()> {
        let mut state = self.enter("arm_laser")?;
        state.armed = armed;
        Ok(())
    }

    fn is_laser_armed(&self, _card: CardHandle) -> RawResult<bool> {
        Ok(self.enter("is_laser_armed")?.armed)
    }

    fn enable_pilot(&self, _card: CardHandle, enabled: bool) -> RawResult<()> {
        let mut state = self.enter("enable_pilot")?;
        state.pilot = enabled;
        Ok(())
    }

    fn is_pilot_enabled(&self, _card: CardHandle) -> RawResult<bool> {
        Ok(self.enter("is_pilot_enabled")?.pilot)
    }

    fn read_laser_status(&self, _card: CardHandle) -> RawResult<u32> {
        Ok(self.enter("read_laser_status")?.status_bits)
    }

    fn laser_get_config(&self, _card: CardHandle, buffer: &mut [u8]) -> RawResult<()> {
        let state = self.enter("laser_get_config")?;
        let stored = state.laser_config.len().min(buffer.len());
        buffer[..stored].copy_from_slice(&state.laser_config[..stored]);
        buffer[stored..].fill(0);
        Ok(())
    }

    fn laser_set_config(&self, _card: CardHandle, buffer: &[u8]) -> RawResult<()> {
        let mut state = self.enter("laser_set_config")?;
        state.laser_config = buffer.to_vec();
        Ok(())
    }

    fn list_allocate(&self, _card: CardHandle) -> RawResult<ListHandle> {
        let mut state = self.enter("list_allocate")?;
        let handle = ListHandle(state.next_list);
        state.next_list += 1;
        state.lists.insert(handle, Vec::new());
        Ok(handle)
    }

    fn list_release_handle(&self, list: ListHandle) -> RawResult<()> {
        let mut state = self.enter("list_release_handle")?;
        state.released.push(list);
        Ok(())
    }

    fn list_append_laser_on(&self, list: ListHandle) -> RawResult<()> {
        self.append("list_append_laser_on", list, ScanCommand::LaserOn)
    }

    fn list_append_laser_off(&self, list: ListHandle) -> RawResult<()> {
        self.append("list_append_laser_off", list, ScanCommand::LaserOff)
    }

    fn list_append_power(&self, list: ListHandle, units: u16) -> RawResult<()> {
        self.append("list_append_power", list, ScanCommand::SetPower { units })
    }

    fn list_append_jump_speed(&self, list: ListHandle, meters_per_second: f64) -> RawResult<()> {
        self.append(
            "list_append_jump_speed",
            list,
            ScanCommand::SetJumpSpeed { meters_per_second },
        )
    }

    fn list_append_mark_speed(&self, list: ListHandle, meters_per_second: f64) -> RawResult<()> {
        self.append(
            "list_append_mark_speed",
            list,
            ScanCommand::SetMarkSpeed { meters_per_second },
        )
    }

    fn list_append_jump_abs_2d(&self, list: ListHandle, x: f64, y: f64) -> RawResult<()> {
        self.append("list_append_jump_abs_2d", list, ScanCommand::JumpAbsolute { x, y })
    }

    fn list_append_mark_abs_2d(&self, list: ListHandle, x: f64, y: f64) -> RawResult<()> {
        self.append("list_append_mark_abs_2d", list, ScanCommand::MarkAbsolute { x, y })
    }

    fn list_set(
        &self,
        card: CardHandle,
        list_id: u32,
        list: ListHandle,
        _append: bool,
        _execution_limit: i32,
    ) -> RawResult<()> {
        let mut state = self.enter("list_set")?;
        state.slots.insert((card, list_id), list);
        Ok(())
    }

    fn list_execute(&self, card: CardHandle, list_id: u32) -> RawResult<()> {
        let mut state = self.enter("list_execute")?;
        state.executed.push((card, list_id));
        state.in_progress = true;
        Ok(())
    }

    fn list_wait_for_list_done(&self, _card: CardHandle, _timeout_ms: u32) -> RawResult<(bool, i32)> {
        let mut state = self.enter("list_wait_for_list_done")?;
        match state.polls_until_done {
            Some(0) => {
                state.in_progress = false;
                Ok((true, 0))
            }
            Some(remaining) => {
                state.polls_until_done = Some(remaining - 1);
                Ok((false, 0))
            }
            None => Ok((false, 0)),
        }
    }

    fn list_delete(&self, card: CardHandle, list_id: u32, _from_disk: bool) -> RawResult<()> {
        let mut state = self.enter("list_delete")?;
        state.slots.remove(&(card, list_id));
        Ok(())
    }

    fn list_is_execution_in_progress(&self, _card: CardHandle) -> RawResult<bool> {
        Ok(self.enter("list_is_execution_in_progress")?.in_progress)
    }

    fn list_abort_execution(&self, _card: CardHandle) -> RawResult<()> {
        let mut state = self.enter("list_abort_execution")?;
        state.in_progress = false;
        Ok(())
    }

    fn gpio_write(&self, _card: CardHandle, _port: u32, action: GpioAction, mask: u32) -> RawResult<()> {
        let mut state = self.enter("gpio_write")?;
        state.gpio_writes.push((action, mask));
        Ok(())
    }

    fn last_error_length(&self) -> usize {
        let mut state = self.lock();
        state.calls.push("last_error_length".to_string());
        state.last_error.len()
    }

    fn last_error(&self, buffer: &mut [u8]) -> RawResult<()> {
        let mut state = self.lock();
        state.calls.push("last_error".to_string());
        let message = state.last_error.as_bytes();
        let length = message.len().min(buffer.len());
        buffer[..length].copy_from_slice(&message[..length]);
        Ok(())
    }
}
