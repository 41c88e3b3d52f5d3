//! Per-step velocity profile.
//!
//! [`MotionProfile`] holds everything the step-pulse interrupt needs and
//! nothing that touches hardware, so the ramp logic can be exercised on the
//! host one pulse at a time.

use crate::error::MotionError;

use super::accel::{AccelCurve, AccelLaw};

/// Direction of grid travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Toward the in-field end-stop.
    Forward,
    /// Toward the home end-stop.
    Backward,
}

impl Direction {
    /// The opposite direction.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// Ramp phase of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Not moving.
    Idle,
    /// Accelerating toward cruise speed.
    Accel,
    /// Cruising at max speed.
    Const,
    /// Decelerating toward start speed.
    Decel,
    /// Runaway detected; latched until reset.
    Error,
}

/// Last notable event reported by the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorEvent {
    /// Nothing since the move started.
    None,
    /// Motor stopped.
    Stopped,
    /// Cruise speed reached.
    ConstSpeedReached,
    /// Cruise phase ended, deceleration started.
    ConstSpeedEnded,
}

/// What happens when a move's step budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MoveKind {
    /// Stop after exactly `steps_to_go` steps.
    Bounded,
    /// Travel toward an end-stop; reverse if the budget runs out.
    /// Every such reversal counts toward the runaway detector.
    FullRange,
    /// Back-and-forth exposure motion; reversals are expected.
    Oscillation,
    /// Ramp down from the current speed and stop at start speed.
    DecelerateAndStop,
}

/// Action the engine must take after a step has been accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Keep pulsing at the new speed.
    Continue,
    /// Reverse direction.
    Reverse,
    /// Stop the motor.
    Stop,
}

/// Parameters of a single move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    /// Initial direction.
    pub direction: Direction,
    /// Step budget of one leg.
    pub steps: i32,
    /// Start speed in steps/s.
    pub min_speed: f32,
    /// Cruise speed in steps/s.
    pub max_speed: f32,
    /// Acceleration law of the ramps.
    pub law: AccelLaw,
    /// End-of-budget behaviour.
    pub kind: MoveKind,
    /// Step at which cruising ends; defaults to `steps`.
    pub decel_at: Option<i32>,
}

impl MoveRequest {
    /// Create a move request.
    pub fn new(
        direction: Direction,
        steps: i32,
        min_speed: f32,
        max_speed: f32,
        law: AccelLaw,
        kind: MoveKind,
    ) -> Self {
        Self {
            direction,
            steps,
            min_speed,
            max_speed,
            law,
            kind,
            decel_at: None,
        }
    }

    /// End the cruise phase early, at `step`.
    pub fn decelerate_at(mut self, step: i32) -> Self {
        self.decel_at = Some(step);
        self
    }
}

/// Live velocity profile of the motor.
#[derive(Debug, Clone)]
pub struct MotionProfile {
    current_step: i32,
    steps_to_go: i32,
    decel_point: i32,
    speed: f32,
    min_speed: f32,
    max_speed: f32,
    acceleration: f32,
    ramp_time_us: u32,
    direction: Direction,
    mode: Mode,
    direction_reversals_since_start: u8,
    last_event: MotorEvent,
    kind: MoveKind,
    curve: AccelCurve,
    /// Steps spent accelerating in the current leg; unwound while decelerating.
    ramp_steps: i32,
    /// Position on the time axis of a time-based curve.
    ramp_clock_us: f32,
    /// Total time spent accelerating since the move started.
    accel_phase_time_us: f32,
    legs: u32,
}

impl MotionProfile {
    /// Create an idle profile.
    ///
    /// * `acceleration` - per-step speed increment of the parabolic law
    /// * `ramp_time_us` - ramp width `T` of the time-based laws
    pub fn new(acceleration: f32, ramp_time_us: u32) -> Self {
        Self {
            current_step: 0,
            steps_to_go: 0,
            decel_point: 0,
            speed: 0.0,
            min_speed: 0.0,
            max_speed: 0.0,
            acceleration,
            ramp_time_us,
            direction: Direction::Forward,
            mode: Mode::Idle,
            direction_reversals_since_start: 0,
            last_event: MotorEvent::Stopped,
            kind: MoveKind::Bounded,
            curve: AccelCurve::Flat,
            ramp_steps: 0,
            ramp_clock_us: 0.0,
            accel_phase_time_us: 0.0,
            legs: 0,
        }
    }

    /// Load a new move and enter `Accel`.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::InvalidMove` for a non-positive step budget or
    /// start speed, and `MotionError::InvalidCurve` if the law cannot be
    /// solved for the requested speeds.
    pub fn begin(&mut self, request: &MoveRequest) -> Result<(), MotionError> {
        if request.steps <= 0 || request.min_speed <= 0.0 {
            return Err(MotionError::InvalidMove {
                steps: request.steps,
            });
        }

        let max_speed = request.max_speed.max(request.min_speed);
        self.curve = AccelCurve::new(
            request.law,
            request.min_speed,
            max_speed,
            self.acceleration,
            self.ramp_time_us,
        )?;

        self.current_step = 0;
        self.steps_to_go = request.steps;
        self.decel_point = request.decel_at.unwrap_or(request.steps).clamp(1, request.steps);
        self.speed = request.min_speed;
        self.min_speed = request.min_speed;
        self.max_speed = max_speed;
        self.direction = request.direction;
        self.mode = Mode::Accel;
        self.direction_reversals_since_start = 0;
        self.last_event = MotorEvent::None;
        self.kind = request.kind;
        self.ramp_steps = 0;
        self.ramp_clock_us = 0.0;
        self.accel_phase_time_us = 0.0;
        self.legs = 0;
        Ok(())
    }

    /// Account one completed step.
    ///
    /// Constant time, no allocation: called from the step-pulse interrupt.
    pub fn advance(&mut self) -> StepAction {
        if !self.is_active() {
            return StepAction::Continue;
        }

        self.current_step = self.current_step.saturating_add(1);
        self.update_speed();

        if self.kind == MoveKind::DecelerateAndStop {
            let ramp_done = self.ramp_steps == 0 || self.speed <= self.min_speed;
            return if self.mode == Mode::Decel && ramp_done {
                StepAction::Stop
            } else {
                StepAction::Continue
            };
        }

        if self.current_step < self.steps_to_go {
            return StepAction::Continue;
        }

        match self.kind {
            MoveKind::Bounded | MoveKind::DecelerateAndStop => StepAction::Stop,
            MoveKind::FullRange | MoveKind::Oscillation => StepAction::Reverse,
        }
    }

    fn update_speed(&mut self) {
        // Period of the step that just completed.
        let dt_us = 1_000_000.0 / self.speed;

        match self.mode {
            Mode::Accel => {
                self.accel_phase_time_us += dt_us;
                if self.curve.is_time_based() {
                    self.ramp_clock_us += dt_us;
                }
                self.speed = self.curve.accelerate(
                    self.speed,
                    self.ramp_clock_us,
                    self.min_speed,
                    self.max_speed,
                );
                self.ramp_steps += 1;

                if self.speed >= self.max_speed {
                    self.speed = self.max_speed;
                    self.mode = Mode::Const;
                    self.last_event = MotorEvent::ConstSpeedReached;
                }
                if self.ramp_steps >= self.decel_point / 2 {
                    self.mode = Mode::Decel;
                }
            }
            Mode::Const => {
                if self.current_step + self.ramp_steps >= self.decel_point {
                    self.mode = Mode::Decel;
                    self.last_event = MotorEvent::ConstSpeedEnded;
                }
            }
            Mode::Decel => {
                if self.ramp_steps > 0 {
                    self.ramp_steps -= 1;
                    if self.curve.is_time_based() {
                        self.ramp_clock_us = (self.ramp_clock_us - dt_us).max(0.0);
                    }
                    self.speed = if self.ramp_steps == 0 {
                        self.min_speed
                    } else {
                        self.curve.decelerate(
                            self.speed,
                            self.ramp_clock_us,
                            self.min_speed,
                            self.max_speed,
                        )
                    };
                } else {
                    self.speed = self.min_speed;
                }
            }
            Mode::Idle | Mode::Error => {}
        }
    }

    /// Flip direction and restart the ramp from start speed.
    pub fn reverse(&mut self) {
        if self.kind != MoveKind::Oscillation {
            self.direction_reversals_since_start =
                self.direction_reversals_since_start.saturating_add(1);
        }
        self.direction = self.direction.reversed();
        self.speed = self.min_speed;
        self.mode = Mode::Accel;
        self.current_step = 0;
        self.ramp_steps = 0;
        self.ramp_clock_us = 0.0;
        self.legs = self.legs.wrapping_add(1);
    }

    /// Abandon the current move kind and ramp down to a stop.
    pub fn begin_deceleration(&mut self) {
        if !self.is_active() {
            return;
        }
        self.kind = MoveKind::DecelerateAndStop;
        self.mode = Mode::Decel;
    }

    /// Shift the step counter by a signed offset.
    #[inline]
    pub fn correct_offset(&mut self, steps: i32) {
        self.current_step = self.current_step.saturating_add(steps);
    }

    /// Mark the profile stopped.
    pub fn halt(&mut self) {
        if self.mode != Mode::Error {
            self.mode = Mode::Idle;
        }
        self.last_event = MotorEvent::Stopped;
    }

    /// Latch the runaway fault.
    pub fn fault(&mut self) {
        self.mode = Mode::Error;
        self.last_event = MotorEvent::Stopped;
    }

    /// Clear a latched fault back to `Idle`.
    pub fn clear_fault(&mut self) {
        if self.mode == Mode::Error {
            self.mode = Mode::Idle;
            self.direction_reversals_since_start = 0;
        }
    }

    /// More than one reversal outside an oscillation move.
    #[inline]
    pub fn is_runaway(&self) -> bool {
        self.kind != MoveKind::Oscillation && self.direction_reversals_since_start > 1
    }

    /// Whether a move is in progress.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.mode, Mode::Accel | Mode::Const | Mode::Decel)
    }

    /// Pulse timer reload value for the current speed.
    ///
    /// Returns `None` when the value would not fit the 16-bit timer, in which
    /// case the previous interval must stay armed.
    #[inline]
    pub fn interval_ticks(&self, timer_clock_hz: u32) -> Option<u16> {
        let speed = self.speed as u32;
        if speed == 0 {
            return None;
        }
        let ticks = timer_clock_hz / speed;
        if ticks == 0 || ticks >= u16::MAX as u32 {
            None
        } else {
            Some(ticks as u16)
        }
    }

    /// Steps taken in the current leg.
    #[inline]
    pub fn current_step(&self) -> i32 {
        self.current_step
    }

    /// Step budget of one leg.
    #[inline]
    pub fn steps_to_go(&self) -> i32 {
        self.steps_to_go
    }

    /// Current speed in steps/s.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Start speed of the move.
    #[inline]
    pub fn min_speed(&self) -> f32 {
        self.min_speed
    }

    /// Cruise speed of the move.
    #[inline]
    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    /// Per-step increment of the parabolic law.
    #[inline]
    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    /// Current direction.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current ramp phase.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Most recent event.
    #[inline]
    pub fn last_event(&self) -> MotorEvent {
        self.last_event
    }

    /// Kind of the move in progress.
    #[inline]
    pub fn kind(&self) -> MoveKind {
        self.kind
    }

    /// Counted reversals since the move started.
    #[inline]
    pub fn direction_reversals_since_start(&self) -> u8 {
        self.direction_reversals_since_start
    }

    /// Total accelerating time since the move started, in microseconds.
    #[inline]
    pub fn accel_phase_time_us(&self) -> u32 {
        self.accel_phase_time_us as u32
    }

    /// Number of reversals of any kind since the move started.
    #[inline]
    pub fn leg(&self) -> u32 {
        self.legs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: MoveKind, steps: i32) -> MoveRequest {
        MoveRequest::new(Direction::Forward, steps, 500.0, 1440.0, AccelLaw::Parabolic, kind)
    }

    fn run_until_action(profile: &mut MotionProfile) -> (StepAction, i32) {
        let mut taken = 0;
        loop {
            let action = profile.advance();
            taken += 1;
            if action != StepAction::Continue {
                return (action, taken);
            }
            assert!(taken < 100_000, "profile never finished");
        }
    }

    #[test]
    fn test_bounded_stops_at_budget() {
        let mut profile = MotionProfile::new(40.0, 40_000);
        profile.begin(&request(MoveKind::Bounded, 240)).unwrap();

        let (action, taken) = run_until_action(&mut profile);
        assert_eq!(action, StepAction::Stop);
        assert_eq!(taken, 240);
        assert_eq!(profile.direction_reversals_since_start(), 0);
    }

    #[test]
    fn test_trapezoid_phases() {
        let mut profile = MotionProfile::new(40.0, 40_000);
        profile.begin(&request(MoveKind::Bounded, 240)).unwrap();

        let mut saw_const = false;
        let mut saw_decel = false;
        while profile.advance() == StepAction::Continue {
            match profile.mode() {
                Mode::Const => {
                    saw_const = true;
                    assert_eq!(profile.speed(), 1440.0);
                }
                Mode::Decel => saw_decel = true,
                _ => {}
            }
        }
        assert!(saw_const);
        assert!(saw_decel);
        assert_eq!(profile.speed(), 500.0);
    }

    #[test]
    fn test_short_move_is_triangular() {
        let mut profile = MotionProfile::new(40.0, 40_000);
        profile.begin(&request(MoveKind::Bounded, 20)).unwrap();

        let mut peak: f32 = 0.0;
        while profile.advance() == StepAction::Continue {
            assert_ne!(profile.mode(), Mode::Const);
            peak = peak.max(profile.speed());
        }
        assert!(peak < 1440.0);
    }

    #[test]
    fn test_second_full_range_reversal_is_runaway() {
        let mut profile = MotionProfile::new(40.0, 40_000);
        profile.begin(&request(MoveKind::FullRange, 50)).unwrap();

        let (action, _) = run_until_action(&mut profile);
        assert_eq!(action, StepAction::Reverse);
        profile.reverse();
        assert!(!profile.is_runaway());

        let (action, _) = run_until_action(&mut profile);
        assert_eq!(action, StepAction::Reverse);
        profile.reverse();
        assert!(profile.is_runaway());
    }

    #[test]
    fn test_oscillation_reversals_not_counted() {
        let mut profile = MotionProfile::new(40.0, 40_000);
        profile.begin(&request(MoveKind::Oscillation, 60)).unwrap();

        for leg in 1..=10 {
            let (action, _) = run_until_action(&mut profile);
            assert_eq!(action, StepAction::Reverse);
            profile.reverse();
            assert_eq!(profile.leg(), leg);
        }
        assert_eq!(profile.direction_reversals_since_start(), 0);
        assert!(!profile.is_runaway());
    }

    #[test]
    fn test_decelerate_and_stop_from_cruise() {
        let mut profile = MotionProfile::new(40.0, 40_000);
        profile.begin(&request(MoveKind::Oscillation, 10_000)).unwrap();
        while profile.mode() != Mode::Const {
            profile.advance();
        }

        profile.begin_deceleration();
        let (action, _) = run_until_action(&mut profile);
        assert_eq!(action, StepAction::Stop);
        assert_eq!(profile.speed(), 500.0);
    }

    #[test]
    fn test_correct_offset() {
        let mut profile = MotionProfile::new(40.0, 40_000);
        profile.begin(&request(MoveKind::Oscillation, 300)).unwrap();
        profile.advance();
        profile.correct_offset(-150);
        assert_eq!(profile.current_step(), -149);
    }

    #[test]
    fn test_interval_rejects_out_of_range() {
        let mut profile = MotionProfile::new(40.0, 40_000);
        profile.begin(&request(MoveKind::Bounded, 10)).unwrap();
        assert_eq!(profile.interval_ticks(1_062_500), Some(2125));
        // 100 MHz / 500 steps/s overflows the 16-bit reload register
        assert_eq!(profile.interval_ticks(100_000_000), None);
    }

    #[test]
    fn test_invalid_request() {
        let mut profile = MotionProfile::new(40.0, 40_000);
        assert_eq!(
            profile.begin(&request(MoveKind::Bounded, 0)),
            Err(MotionError::InvalidMove { steps: 0 })
        );
        assert_eq!(profile.mode(), Mode::Idle);
    }
}
