//! Radio controller and host stack bring-up.
//!
//! Strictly ordered, no retries: each step is the prerequisite for the
//! next and the first failure aborts with the stage that failed.

use log::{error, info};

use crate::app::ports::GattStack;
use crate::error::{BringUpError, BringUpStage, StackError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    Uninitialized,
    ControllerEnabled,
    HostEnabled,
    CallbacksBound,
    Ready,
}

#[derive(Debug)]
pub struct StackController {
    state: StackState,
}

impl Default for StackController {
    fn default() -> Self {
        Self::new()
    }
}

impl StackController {
    pub const fn new() -> Self {
        Self {
            state: StackState::Uninitialized,
        }
    }

    pub fn state(&self) -> StackState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == StackState::Ready
    }

    /// Bring the controller and host online and bind both callback sinks.
    ///
    /// On failure the state stays at the last step that succeeded.
    pub fn bring_up<S: GattStack>(&mut self, stack: &mut S) -> Result<(), BringUpError> {
        if self.state != StackState::Uninitialized {
            return Err(BringUpError {
                stage: BringUpStage::AlreadyStarted,
                code: StackError(0),
            });
        }

        step(BringUpStage::ReleaseClassicMemory, stack.release_classic_memory())?;
        step(BringUpStage::ControllerInit, stack.init_controller())?;
        step(BringUpStage::ControllerEnable, stack.enable_controller())?;
        self.state = StackState::ControllerEnabled;

        step(BringUpStage::HostInit, stack.init_host())?;
        step(BringUpStage::HostEnable, stack.enable_host())?;
        self.state = StackState::HostEnabled;

        step(BringUpStage::GattsCallback, stack.register_gatts_callback())?;
        step(BringUpStage::GapCallback, stack.register_gap_callback())?;
        self.state = StackState::CallbacksBound;

        info!("BT: controller and host enabled, callbacks bound");
        Ok(())
    }

    /// Profiles have been submitted for registration; events may flow.
    pub fn mark_ready(&mut self) {
        if self.state == StackState::CallbacksBound {
            self.state = StackState::Ready;
        }
    }
}

fn step(stage: BringUpStage, result: Result<(), StackError>) -> Result<(), BringUpError> {
    result.map_err(|code| {
        error!("BT: {stage} failed: {code}");
        BringUpError { stage, code }
    })
}
