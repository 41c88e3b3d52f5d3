//! Host fakes shared by the unit tests.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::error::{MotionError, Result};
use crate::io::{Input, InputBank, OneShotTimer, Output, OutputBank, PulseGenerator};
use crate::motion::{Direction, GridMotor, Mode, MotorEvent, MoveSpeed};

/// Output pin whose level can be observed through a clone.
#[derive(Clone, Default)]
pub struct FlagPin(Rc<Cell<bool>>);

impl FlagPin {
    pub fn is_high(&self) -> bool {
        self.0.get()
    }
}

impl ErrorType for FlagPin {
    type Error = Infallible;
}

impl OutputPin for FlagPin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

#[derive(Default)]
struct PulseState {
    running: bool,
    interval: Option<u16>,
    calls: usize,
}

/// Pulse generator that records what it was told.
#[derive(Clone, Default)]
pub struct FakePulse(Rc<RefCell<PulseState>>);

impl FakePulse {
    pub fn running(&self) -> bool {
        self.0.borrow().running
    }

    pub fn interval(&self) -> Option<u16> {
        self.0.borrow().interval
    }

    pub fn calls(&self) -> usize {
        self.0.borrow().calls
    }
}

impl PulseGenerator for FakePulse {
    fn start(&mut self) {
        let mut s = self.0.borrow_mut();
        s.running = true;
        s.calls += 1;
    }

    fn stop(&mut self) {
        let mut s = self.0.borrow_mut();
        s.running = false;
        s.calls += 1;
    }

    fn set_interval(&mut self, ticks: u16) {
        let mut s = self.0.borrow_mut();
        s.interval = Some(ticks);
        s.calls += 1;
    }
}

/// Input bank driven directly by the test, in logical levels.
///
/// Levels set by the test become visible at the next refresh.
#[derive(Default)]
pub struct FakeInputs {
    next: [bool; 3],
    level: [bool; 3],
    inverted: [bool; 3],
}

fn input_index(input: Input) -> usize {
    match input {
        Input::ExpReq => 0,
        Input::GridHome => 1,
        Input::GridInField => 2,
    }
}

impl FakeInputs {
    pub fn set(&mut self, input: Input, high: bool) {
        self.next[input_index(input)] = high;
    }

    pub fn is_inverted(&self, input: Input) -> bool {
        self.inverted[input_index(input)]
    }
}

impl InputBank for FakeInputs {
    fn refresh(&mut self) {
        self.level = self.next;
    }

    fn is_high(&self, input: Input) -> bool {
        self.level[input_index(input)]
    }

    fn set_inverted(&mut self, input: Input, inverted: bool) {
        self.inverted[input_index(input)] = inverted;
    }
}

/// Output bank that only remembers levels.
#[derive(Default)]
pub struct FakeOutputs([bool; 3]);

fn output_index(output: Output) -> usize {
    match output {
        Output::Indication0 => 0,
        Output::Indication1 => 1,
        Output::InMotion => 2,
    }
}

impl OutputBank for FakeOutputs {
    fn set(&mut self, output: Output, high: bool) {
        self.0[output_index(output)] = high;
    }

    fn is_high(&self, output: Output) -> bool {
        self.0[output_index(output)]
    }
}

/// One-shot timer that records its arming.
#[derive(Default)]
pub struct FakeTimer {
    pub armed: Option<u16>,
    pub arm_count: usize,
}

impl OneShotTimer for FakeTimer {
    fn arm(&mut self, delay_ms: u16) {
        self.armed = Some(delay_ms);
        self.arm_count += 1;
    }

    fn cancel(&mut self) {
        self.armed = None;
    }
}

/// Motor call recorded by [`FakeMotor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCall {
    Stop,
    CorrectOffset(i32),
    DecelerateAndStop,
    MoveBy(Direction, i32),
    EndStop(Direction, MoveSpeed),
    PressSwitch,
    Exposition(Direction),
}

/// Motor that records calls; the test decides when moves finish.
pub struct FakeMotor {
    pub calls: Vec<MotorCall>,
    pub moving: bool,
    pub mode: Mode,
    pub event: MotorEvent,
    pub direction: Direction,
    pub current_step: i32,
    pub steps_to_go: i32,
    pub leg: u32,
    pub accel_time_us: u32,
    /// Every move start fails as if the DIR line could not be driven.
    pub fail_moves: bool,
}

impl Default for FakeMotor {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            moving: false,
            mode: Mode::Idle,
            event: MotorEvent::Stopped,
            direction: Direction::Forward,
            current_step: 0,
            steps_to_go: 0,
            leg: 0,
            accel_time_us: 0,
            fail_moves: false,
        }
    }
}

impl FakeMotor {
    /// Complete the move in progress.
    pub fn finish(&mut self) {
        self.moving = false;
        self.mode = Mode::Idle;
        self.event = MotorEvent::Stopped;
    }

    pub fn last_call(&self) -> Option<MotorCall> {
        self.calls.last().copied()
    }

    fn begin(&mut self, call: MotorCall, direction: Direction, steps: i32) -> Result<()> {
        self.calls.push(call);
        if self.fail_moves {
            return Err(MotionError::PinError.into());
        }
        if !self.moving && self.mode != Mode::Error {
            self.moving = true;
            self.mode = Mode::Accel;
            self.event = MotorEvent::None;
            self.direction = direction;
            self.current_step = 0;
            self.steps_to_go = steps;
            self.leg = 0;
            self.accel_time_us = 0;
        }
        Ok(())
    }
}

impl GridMotor for FakeMotor {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn last_event(&self) -> MotorEvent {
        self.event
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn is_moving(&self) -> bool {
        self.moving
    }

    fn current_step(&self) -> i32 {
        self.current_step
    }

    fn steps_to_go(&self) -> i32 {
        self.steps_to_go
    }

    fn leg(&self) -> u32 {
        self.leg
    }

    fn accel_phase_time_us(&self) -> u32 {
        self.accel_time_us
    }

    fn stop(&mut self) {
        self.calls.push(MotorCall::Stop);
        if self.moving {
            self.finish();
        }
    }

    fn correct_offset(&mut self, steps: i32) {
        self.calls.push(MotorCall::CorrectOffset(steps));
        self.current_step += steps;
    }

    fn decelerate_and_stop(&mut self) {
        self.calls.push(MotorCall::DecelerateAndStop);
        if self.moving {
            self.mode = Mode::Decel;
        }
    }

    fn move_by(&mut self, direction: Direction, steps: i32) -> Result<()> {
        self.begin(MotorCall::MoveBy(direction, steps), direction, steps)
    }

    fn move_to_end_stop(&mut self, direction: Direction, speed: MoveSpeed) -> Result<()> {
        self.begin(MotorCall::EndStop(direction, speed), direction, 8992)
    }

    fn press_switch(&mut self) -> Result<()> {
        let direction = self.direction;
        self.begin(MotorCall::PressSwitch, direction, 48)
    }

    fn exposition(&mut self, direction: Direction) -> Result<()> {
        self.begin(MotorCall::Exposition(direction), direction, 300)
    }
}
