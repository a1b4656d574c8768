//! List execution state machine.
//!
//! An [`ExecutionController`] takes one [`ScanList`] through
//! upload, execution, polling and cleanup:
//!
//! ```text
//! Idle → SlotAssigned → Executing → Completed | TimedOut | Failed → SlotCleared
//! ```
//!
//! The controller is also the cleanup guard for its list. Until
//! [`finish`](ExecutionController::finish) has deleted the slot, dropping
//! the controller aborts any running execution and deletes the slot from the
//! card. Cleanup failures are logged and never replace the error that
//! caused the early exit.
//!
//! [`wait_for_completion`] is the polling loop shared by single- and
//! multi-card drawing.

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use lasercard_core::constants::EXECUTION_POLL_INTERVAL_MS;
use lasercard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::list::ScanList;
use crate::toolpath::ToolpathLayer;

/// Maximum number of state transitions kept per controller.
const MAX_HISTORY_SIZE: usize = 16;

/// Phase of a list execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// List allocated, not yet on the card.
    Idle,
    /// List stored in a slot on the card.
    SlotAssigned,
    /// Card is running the list.
    Executing,
    /// Card reported the list done.
    Completed,
    /// Overall scanning timeout exceeded.
    TimedOut,
    /// Build, device or timing failure.
    Failed,
    /// Slot deleted from the card.
    SlotCleared,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            ExecutionState::Idle => "Idle",
            ExecutionState::SlotAssigned => "SlotAssigned",
            ExecutionState::Executing => "Executing",
            ExecutionState::Completed => "Completed",
            ExecutionState::TimedOut => "TimedOut",
            ExecutionState::Failed => "Failed",
            ExecutionState::SlotCleared => "SlotCleared",
        };
        write!(f, "{}", state_str)
    }
}

impl ExecutionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasercard_driver::ExecutionState;
    ///
    /// assert!(ExecutionState::Idle.can_transition_to(&ExecutionState::SlotAssigned));
    /// assert!(!ExecutionState::Idle.can_transition_to(&ExecutionState::Executing));
    /// ```
    pub fn can_transition_to(&self, target: &ExecutionState) -> bool {
        matches!(
            (self, target),
            // From Idle
            (ExecutionState::Idle, ExecutionState::SlotAssigned | ExecutionState::Failed)
            // From SlotAssigned
            | (
                ExecutionState::SlotAssigned,
                ExecutionState::SlotAssigned
                    | ExecutionState::Executing
                    | ExecutionState::Failed
                    | ExecutionState::SlotCleared
            )
            // From Executing
            | (
                ExecutionState::Executing,
                ExecutionState::Completed | ExecutionState::TimedOut | ExecutionState::Failed
            )
            // From terminal states
            | (
                ExecutionState::Completed | ExecutionState::TimedOut | ExecutionState::Failed,
                ExecutionState::SlotCleared
            )
        )
    }

    /// Whether the card is done with the list, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Completed | ExecutionState::TimedOut | ExecutionState::Failed
        )
    }
}

/// One recorded state change.
#[derive(Debug, Clone, Copy)]
pub struct StateTransition {
    pub from: ExecutionState,
    pub to: ExecutionState,
    pub at: Instant,
}

/// Drives one list through its execution and guarantees slot cleanup.
#[derive(Debug)]
pub struct ExecutionController {
    list: ScanList,
    state: ExecutionState,
    history: VecDeque<StateTransition>,
    armed: bool,
}

impl ExecutionController {
    /// Take ownership of a freshly allocated list.
    pub fn new(list: ScanList) -> Self {
        Self {
            list,
            state: ExecutionState::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            armed: true,
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// The guarded list. Card-side operations go through the controller.
    pub fn list(&self) -> &ScanList {
        &self.list
    }

    /// Recorded transitions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &StateTransition> {
        self.history.iter()
    }

    fn transition_to(&mut self, target: ExecutionState) -> Result<()> {
        if !self.state.can_transition_to(&target) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }

        debug!(list = %self.list.handle(), from = %self.state, to = %target, "Execution state change");
        if self.history.len() == MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(StateTransition {
            from: self.state,
            to: target,
            at: Instant::now(),
        });
        self.state = target;
        Ok(())
    }

    /// Build the list from a layer while the controller guards it.
    pub fn add_layer(
        &mut self,
        layer: &dyn ToolpathLayer,
        laser_index_filter: u32,
        fail_if_unassigned: bool,
    ) -> Result<()> {
        self.list
            .add_layer_to_list(layer, laser_index_filter, fail_if_unassigned)
    }

    /// Store the list in `slot`, replacing any slot it held before.
    pub fn set_list_on_card(&mut self, slot: u32) -> Result<()> {
        self.ensure_transition(ExecutionState::SlotAssigned)?;
        self.list.set_list_on_card(slot)?;
        self.transition_to(ExecutionState::SlotAssigned)
    }

    /// Start executing the list in `slot`.
    pub fn execute_list(&mut self, slot: u32) -> Result<()> {
        self.ensure_transition(ExecutionState::Executing)?;
        self.list.execute_list(slot)?;
        self.transition_to(ExecutionState::Executing)
    }

    /// One bounded poll. Moves to `Completed` once the card reports done.
    pub fn wait_for_execution(&mut self, timeout_ms: u32) -> Result<bool> {
        if self.state == ExecutionState::Completed {
            return Ok(true);
        }

        let done = self.list.wait_for_execution(timeout_ms)?;
        if done {
            self.transition_to(ExecutionState::Completed)?;
        }
        Ok(done)
    }

    /// Delete the slot from the card. No-op if no slot is assigned.
    pub fn delete_list_from_card(&mut self) -> Result<()> {
        self.list.delete_list_from_card()?;
        if self.state.can_transition_to(&ExecutionState::SlotCleared) {
            self.transition_to(ExecutionState::SlotCleared)?;
        }
        Ok(())
    }

    pub fn abort_list_execution_if_in_progress(&mut self) -> Result<bool> {
        self.list.abort_execution_if_in_progress()
    }

    /// Delete the slot after a successful run and disarm the cleanup guard.
    pub fn finish(mut self) -> Result<()> {
        self.delete_list_from_card()?;
        self.armed = false;
        info!(list = %self.list.handle(), "List execution finished");
        Ok(())
    }

    /// Record a failure without running cleanup yet.
    pub fn mark_failed(&mut self, timed_out: bool) {
        let target = if timed_out && self.state == ExecutionState::Executing {
            ExecutionState::TimedOut
        } else {
            ExecutionState::Failed
        };

        if self.state.can_transition_to(&target) {
            // Checked above
            let _ = self.transition_to(target);
        }
    }

    fn ensure_transition(&self, target: ExecutionState) -> Result<()> {
        if self.state.can_transition_to(&target) {
            Ok(())
        } else {
            Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            })
        }
    }

    fn cleanup(&mut self) {
        self.mark_failed(false);

        if let Err(e) = self.list.abort_execution_if_in_progress() {
            warn!(list = %self.list.handle(), error = %e, "Abort during cleanup failed");
        }
        if let Err(e) = self.delete_list_from_card() {
            warn!(list = %self.list.handle(), error = %e, "Slot delete during cleanup failed");
        }
    }
}

impl Drop for ExecutionController {
    fn drop(&mut self) {
        if self.armed {
            error!(list = %self.list.handle(), state = %self.state, "List execution ended early, cleaning up");
            self.cleanup();
        }
    }
}

/// Poll every execution until all are done, within `timeout_ms` of `start_ms`.
///
/// Executions are polled in order; the loop moves to the next one only once
/// the current one reports done. Time is checked before every poll.
///
/// # Errors
///
/// - `Error::InvalidSystemTiming` if the clock reads earlier than `start_ms`
/// - `Error::ScanningTimeout` if more than `timeout_ms` have passed
/// - `Error::Device` if a poll fails
pub fn wait_for_completion(
    executions: &mut [ExecutionController],
    clock: &dyn Clock,
    start_ms: u64,
    timeout_ms: u64,
) -> Result<()> {
    loop {
        let mut all_done = true;

        for index in 0..executions.len() {
            let current_ms = clock.now_ms();
            if current_ms < start_ms {
                mark_all_failed(executions, false);
                return Err(Error::InvalidSystemTiming {
                    start_ms,
                    current_ms,
                });
            }

            if current_ms - start_ms > timeout_ms {
                warn!(elapsed_ms = current_ms - start_ms, timeout_ms, "Scanning timeout");
                mark_all_failed(executions, true);
                return Err(Error::ScanningTimeout(timeout_ms));
            }

            if !executions[index].wait_for_execution(EXECUTION_POLL_INTERVAL_MS)? {
                all_done = false;
                break;
            }
        }

        if all_done {
            return Ok(());
        }
    }
}

fn mark_all_failed(executions: &mut [ExecutionController], timed_out: bool) {
    for execution in executions.iter_mut() {
        if !execution.state().is_terminal() {
            execution.mark_failed(timed_out);
        }
    }
}
