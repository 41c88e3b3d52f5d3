//! Supervisory state machine of the grid.
//!
//! [`RasterController::update`] runs once per board tick and sequences the
//! motor through named moves in response to the end-stop switches and the
//! host's exposure request. Multi-leg sequences are chained through a single
//! [`PendingMove`] slot that is drained whenever the motor is idle.

use crate::config::{MoveSettings, RasterSettings};
use crate::error::{Error, RasterFault, Result};
use crate::io::{Input, InputBank, OneShotTimer, Output, OutputBank};
use crate::motion::{Direction, GridMotor, Mode, MotorEvent, MoveSpeed};

use super::deferred::DeferredScheduler;
use super::state::{DeferredTask, DeviceState, EndStop, PendingMove};

/// Snapshot of the controller for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RasterStatus {
    /// Current device state.
    pub state: DeviceState,
    /// End-stop the grid returns to after an exposure.
    pub last_position: EndStop,
    /// Active fault, if any.
    pub fault: Option<RasterFault>,
    /// A fatal fault has halted the device.
    pub halted: bool,
    /// Switch checks are frozen.
    pub switches_ignored: bool,
    /// Queued continuation.
    pub pending_move: Option<PendingMove>,
    /// Task waiting on the one-shot timer.
    pub pending_task: Option<DeferredTask>,
}

/// Raster state machine.
///
/// Generic over:
/// - `IN`: input bank (exposure request, end-stop switches)
/// - `OUT`: output bank (indications, in-motion)
/// - `TIM`: one-shot timer backing the deferred task slot
pub struct RasterController<IN, OUT, TIM>
where
    IN: InputBank,
    OUT: OutputBank,
    TIM: OneShotTimer,
{
    inputs: IN,
    outputs: OUT,
    deferred: DeferredScheduler<TIM>,
    settings: RasterSettings,
    moves: MoveSettings,
    state: DeviceState,
    last_position: EndStop,
    current_error: Option<RasterFault>,
    halted: bool,
    switches_ignored: bool,
    pending_move: Option<PendingMove>,
    /// Oscillation leg whose step counter was already resynced on the home switch.
    resynced_leg: Option<u32>,
}

impl<IN, OUT, TIM> RasterController<IN, OUT, TIM>
where
    IN: InputBank,
    OUT: OutputBank,
    TIM: OneShotTimer,
{
    /// Create a controller in `Init`.
    pub fn new(
        inputs: IN,
        outputs: OUT,
        timer: TIM,
        settings: RasterSettings,
        moves: MoveSettings,
    ) -> Self {
        Self {
            inputs,
            outputs,
            deferred: DeferredScheduler::new(timer),
            settings,
            moves,
            state: DeviceState::Init,
            last_position: EndStop::InField,
            current_error: None,
            halted: false,
            switches_ignored: false,
            pending_move: None,
            resynced_leg: None,
        }
    }

    /// Apply input polarity and perform the single boot move.
    ///
    /// With `test_move` set the grid makes a short excursion toward home and
    /// back instead of homing.
    ///
    /// # Errors
    ///
    /// Propagates motor errors from the boot move, after entering `Error`.
    pub fn board_init<M: GridMotor>(&mut self, motor: &mut M, test_move: bool) -> Result<()> {
        if self.settings.invert_inputs {
            for input in Input::ALL {
                self.inputs.set_inverted(input, true);
            }
        }
        self.inputs.refresh();

        if test_move {
            info!("boot test move");
            motor
                .move_by(Direction::Backward, self.moves.test_move)
                .map_err(|e| self.move_failed(e))?;
            self.set_state(DeviceState::ServiceMoving);
            self.pending_move = Some(PendingMove::TestReturn);
            return Ok(());
        }

        if self.inputs.is_high(Input::GridHome) {
            // Already parked: run out and re-approach so the switch edge is seen.
            motor
                .move_by(Direction::Forward, self.moves.run_out)
                .map_err(|e| self.move_failed(e))?;
            self.set_state(DeviceState::ServiceMoving);
            self.pending_move = Some(PendingMove::Approach(EndStop::Home, MoveSpeed::Slow));
        } else {
            motor
                .move_to_end_stop(Direction::Backward, MoveSpeed::Slow)
                .map_err(|e| self.move_failed(e))?;
            self.set_state(DeviceState::MovingHome);
        }
        Ok(())
    }

    /// One supervisory pass: errors, switches, exposure, pending move.
    ///
    /// # Errors
    ///
    /// Returns `Error::Raster(RasterFault::LimitSwitch)` on this and every
    /// later pass once a runaway was detected. Motor errors are propagated.
    pub fn update<M: GridMotor>(&mut self, motor: &mut M) -> Result<()> {
        self.inputs.refresh();

        self.check_errors(motor)?;
        if !self.switches_ignored {
            self.check_home_switch(motor);
            self.check_in_field_switch(motor);
        }
        self.check_exposure(motor)?;
        self.check_pending_move(motor)
    }

    fn check_errors<M: GridMotor>(&mut self, motor: &mut M) -> Result<()> {
        if self.halted {
            return Err(RasterFault::LimitSwitch.into());
        }

        if motor.mode() == Mode::Error {
            self.current_error = Some(RasterFault::LimitSwitch);
        }

        let Some(fault) = self.current_error else {
            return Ok(());
        };

        motor.stop();
        self.outputs.set(Output::Indication1, true);

        if fault.is_fatal() {
            error!("fatal fault: {}", fault);
            self.halted = true;
            self.pending_move = None;
            self.deferred.cancel();
            self.switches_ignored = false;
            self.outputs.set(Output::InMotion, false);
            self.set_state(DeviceState::Error);
            return Err(fault.into());
        }

        if !self.inputs.is_high(Input::ExpReq) {
            info!("fault cleared: {}", fault);
            self.current_error = None;
            self.outputs.set(Output::Indication1, false);
            self.set_state(self.last_position.parked_state());
        }
        Ok(())
    }

    fn raise_fault<M: GridMotor>(&mut self, fault: RasterFault, motor: &mut M) {
        warn!("fault raised: {}", fault);
        self.current_error = Some(fault);
        self.set_state(DeviceState::Error);
        motor.stop();
        self.outputs.set(Output::Indication1, true);
    }

    /// A move that could not start leaves the grid idle: enter `Error` with
    /// indication 1 so the host sees it.
    fn move_failed(&mut self, e: Error) -> Error {
        error!("move could not start, state {}", self.state);
        self.pending_move = None;
        self.outputs.set(Output::Indication1, true);
        self.set_state(DeviceState::Error);
        e
    }

    fn check_home_switch<M: GridMotor>(&mut self, motor: &mut M) {
        if !self.inputs.is_high(Input::GridHome) {
            self.outputs.set(Output::Indication0, false);
            return;
        }
        self.outputs.set(Output::Indication0, true);

        match self.state {
            DeviceState::MovingHome => self.arrive(EndStop::Home, motor),
            DeviceState::Oscillating if motor.direction() == Direction::Backward => {
                self.resync_oscillation(motor)
            }
            DeviceState::AtHome => motor.stop(),
            _ => {}
        }
    }

    fn check_in_field_switch<M: GridMotor>(&mut self, motor: &mut M) {
        if !self.inputs.is_high(Input::GridInField) {
            return;
        }

        match self.state {
            DeviceState::MovingInField => self.arrive(EndStop::InField, motor),
            DeviceState::AtInField => motor.stop(),
            _ => {}
        }
    }

    fn arrive<M: GridMotor>(&mut self, end: EndStop, motor: &mut M) {
        motor.stop();
        self.set_state(end.parked_state());

        if self.settings.seat_on_switch {
            self.freeze(self.settings.nudge_freeze_ms);
            if let Err(e) = motor.press_switch() {
                let _ = self.move_failed(e);
            }
        }
    }

    /// The home switch marks the middle of the oscillation window: whatever
    /// the counter says, exactly `expo_offset` steps remain in this leg.
    fn resync_oscillation<M: GridMotor>(&mut self, motor: &mut M) {
        let leg = motor.leg();
        if self.resynced_leg == Some(leg) {
            return;
        }
        self.resynced_leg = Some(leg);

        let target = motor.steps_to_go() - self.moves.expo_offset;
        let offset = target - motor.current_step();
        trace!("oscillation resync by {} steps", offset);
        motor.correct_offset(offset);
    }

    fn check_exposure<M: GridMotor>(&mut self, motor: &mut M) -> Result<()> {
        let requested = self.inputs.is_high(Input::ExpReq);
        let exposing = matches!(self.state, DeviceState::Scanning | DeviceState::Oscillating);

        if requested {
            self.exposure_requested(motor)
        } else if exposing {
            self.finish_exposure(motor);
            Ok(())
        } else {
            Ok(())
        }
    }

    fn exposure_requested<M: GridMotor>(&mut self, motor: &mut M) -> Result<()> {
        match self.state {
            // Seating nudge still running: picked up on a later pass
            DeviceState::AtInField | DeviceState::AtHome if motor.is_moving() => Ok(()),
            DeviceState::AtInField => self.begin_exposure(EndStop::InField, motor),
            DeviceState::AtHome => {
                if self.settings.exposure_at_home_allowed {
                    self.begin_exposure(EndStop::Home, motor)
                } else {
                    self.last_position = EndStop::Home;
                    self.raise_fault(RasterFault::ExposureAtDisallowedPosition, motor);
                    Ok(())
                }
            }
            DeviceState::Oscillating => {
                if self.in_motion_ready(motor) && !self.outputs.is_high(Output::InMotion) {
                    debug!("oscillation at speed");
                    self.outputs.set(Output::InMotion, true);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn begin_exposure<M: GridMotor>(&mut self, end: EndStop, motor: &mut M) -> Result<()> {
        self.last_position = end;

        if !self.settings.oscillation_enabled {
            self.set_state(DeviceState::Scanning);
            self.schedule(DeferredTask::RaiseInMotionSignal, self.settings.in_motion_delay_ms);
            return Ok(());
        }

        // Move into the park zone first so the oscillation is centred on the switch.
        motor
            .move_by(end.approach(), self.moves.expo_offset)
            .map_err(|e| self.move_failed(e))?;
        self.set_state(DeviceState::ServiceMoving);
        self.pending_move = Some(PendingMove::StartOscillation(end));
        Ok(())
    }

    fn in_motion_ready<M: GridMotor>(&self, motor: &M) -> bool {
        motor.last_event() == MotorEvent::ConstSpeedReached
            && motor.accel_phase_time_us() >= self.settings.in_motion_min_accel_us
    }

    fn finish_exposure<M: GridMotor>(&mut self, motor: &mut M) {
        self.outputs.set(Output::InMotion, false);

        match self.state {
            DeviceState::Oscillating => {
                self.set_state(DeviceState::ServiceMoving);
                motor.decelerate_and_stop();
                self.pending_move = Some(PendingMove::BackOffThenApproach(self.last_position));
            }
            DeviceState::Scanning => {
                self.set_state(self.last_position.parked_state());
            }
            _ => {}
        }
    }

    fn check_pending_move<M: GridMotor>(&mut self, motor: &mut M) -> Result<()> {
        if self.current_error.is_some() || motor.is_moving() {
            return Ok(());
        }
        let Some(next) = self.pending_move.take() else {
            return Ok(());
        };
        debug!("running continuation {}", next);

        match next {
            PendingMove::StartOscillation(end) => {
                self.last_position = end;
                self.resynced_leg = None;
                motor
                    .exposition(end.approach().reversed())
                    .map_err(|e| self.move_failed(e))?;
                self.set_state(DeviceState::Oscillating);
            }
            PendingMove::BackOffThenApproach(end) => {
                motor
                    .move_by(end.approach().reversed(), self.moves.run_out)
                    .map_err(|e| self.move_failed(e))?;
                self.pending_move = Some(PendingMove::Approach(end, MoveSpeed::Slow));
            }
            PendingMove::Approach(end, speed) => self.move_to(end, speed, motor)?,
            PendingMove::TestReturn => {
                motor
                    .move_by(Direction::Forward, self.moves.test_move)
                    .map_err(|e| self.move_failed(e))?;
                self.set_state(DeviceState::Init);
            }
        }
        Ok(())
    }

    /// Travel to an end-stop, or settle there if its switch is already made.
    ///
    /// Ignored while the motor is still busy with another move.
    ///
    /// # Errors
    ///
    /// Propagates motor errors, after entering `Error`.
    pub fn move_to<M: GridMotor>(&mut self, end: EndStop, speed: MoveSpeed, motor: &mut M) -> Result<()> {
        let switch = match end {
            EndStop::Home => Input::GridHome,
            EndStop::InField => Input::GridInField,
        };
        if self.inputs.is_high(switch) {
            self.set_state(end.parked_state());
            motor.stop();
            return Ok(());
        }

        if motor.is_moving() {
            debug!("move to {} ignored: motor busy", end);
            return Ok(());
        }

        if speed == MoveSpeed::Slow {
            self.freeze(self.settings.freeze_ms);
        }
        motor
            .move_to_end_stop(end.approach(), speed)
            .map_err(|e| self.move_failed(e))?;
        self.set_state(end.moving_state());
        Ok(())
    }

    /// Send the grid to the opposite end-stop at service speed.
    ///
    /// Ignored unless the grid is parked.
    ///
    /// # Errors
    ///
    /// Propagates motor errors.
    pub fn on_grid_button<M: GridMotor>(&mut self, motor: &mut M) -> Result<()> {
        match self.state {
            DeviceState::AtInField => self.move_to(EndStop::Home, MoveSpeed::Fast, motor),
            DeviceState::AtHome => self.move_to(EndStop::InField, MoveSpeed::Fast, motor),
            _ => Ok(()),
        }
    }

    /// Run the deferred task whose delay just elapsed.
    pub fn on_deferred_elapsed(&mut self) {
        if let Some(task) = self.deferred.take_elapsed() {
            self.run_task(task);
        }
    }

    fn run_task(&mut self, task: DeferredTask) {
        match task {
            DeferredTask::UnfreezeSwitches => self.switches_ignored = false,
            DeferredTask::RaiseInMotionSignal => {
                if self.state == DeviceState::Scanning {
                    self.outputs.set(Output::InMotion, true);
                }
            }
        }
    }

    fn schedule(&mut self, task: DeferredTask, delay_ms: u16) {
        // A displaced task never gets its expiry: settle it now.
        match self.deferred.schedule(task, delay_ms) {
            Some(displaced) if displaced != task => self.run_task(displaced),
            _ => {}
        }
    }

    fn freeze(&mut self, delay_ms: u16) {
        if self.state == DeviceState::ServiceMoving {
            return;
        }
        self.switches_ignored = true;
        self.schedule(DeferredTask::UnfreezeSwitches, delay_ms);
    }

    fn set_state(&mut self, next: DeviceState) {
        if self.state != next {
            info!("state {} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Current device state.
    #[inline]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Whether switch checks are frozen.
    #[inline]
    pub fn switches_ignored(&self) -> bool {
        self.switches_ignored
    }

    /// Queued continuation.
    #[inline]
    pub fn pending_move(&self) -> Option<PendingMove> {
        self.pending_move
    }

    /// Level last driven on an output.
    #[inline]
    pub fn output(&self, output: Output) -> bool {
        self.outputs.is_high(output)
    }

    /// Diagnostics snapshot.
    pub fn status(&self) -> RasterStatus {
        RasterStatus {
            state: self.state,
            last_position: self.last_position,
            fault: self.current_error,
            halted: self.halted,
            switches_ignored: self.switches_ignored,
            pending_move: self.pending_move,
            pending_task: self.deferred.pending(),
        }
    }

    /// Input bank, for boards that feed it directly.
    #[inline]
    pub fn inputs_mut(&mut self) -> &mut IN {
        &mut self.inputs
    }

    /// Deferred scheduler, for inspecting the armed timer.
    #[inline]
    pub fn deferred(&self) -> &DeferredScheduler<TIM> {
        &self.deferred
    }
}
