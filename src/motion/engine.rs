//! Interrupt-driven motion engine.
//!
//! Generic over the pulse generator and the embedded-hal direction and
//! enable lines. The engine never blocks: [`MotionEngine::start_move`] arms
//! the pulse generator and every completed pulse comes back through
//! [`MotionEngine::on_step_pulse`].

use embedded_hal::digital::OutputPin;

use crate::config::{MotionConfig, MoveSettings};
use crate::error::{MotionError, Result};
use crate::io::PulseGenerator;

use super::accel::AccelCurve;
use super::profile::{
    Direction, Mode, MotionProfile, MotorEvent, MoveKind, MoveRequest, StepAction,
};

/// Speed class of an end-stop move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MoveSpeed {
    /// Init speed, runs until the switch is seen.
    Slow,
    /// Service speed, brakes before the far end.
    Fast,
}

/// Motor operations the raster controller sequences.
///
/// Implemented by [`MotionEngine`]; the seam lets the supervisory logic be
/// driven without pulse hardware.
pub trait GridMotor {
    /// Current ramp phase.
    fn mode(&self) -> Mode;
    /// Most recent motor event.
    fn last_event(&self) -> MotorEvent;
    /// Current travel direction.
    fn direction(&self) -> Direction;
    /// Whether a move is in progress.
    fn is_moving(&self) -> bool;
    /// Steps taken in the current leg.
    fn current_step(&self) -> i32;
    /// Step budget of one leg.
    fn steps_to_go(&self) -> i32;
    /// Reversals since the move started, oscillation legs included.
    fn leg(&self) -> u32;
    /// Accelerating time since the move started.
    fn accel_phase_time_us(&self) -> u32;

    /// Stop immediately. No-op when idle.
    fn stop(&mut self);
    /// Shift the step counter of the current leg.
    fn correct_offset(&mut self, steps: i32);
    /// Ramp down from the current speed, then stop.
    fn decelerate_and_stop(&mut self);

    /// Bounded move at service speed.
    fn move_by(&mut self, direction: Direction, steps: i32) -> Result<()>;
    /// Full-range move toward an end-stop.
    fn move_to_end_stop(&mut self, direction: Direction, speed: MoveSpeed) -> Result<()>;
    /// Short start-speed nudge in the current direction.
    fn press_switch(&mut self) -> Result<()>;
    /// Oscillation around the park position.
    fn exposition(&mut self, direction: Direction) -> Result<()>;
}

/// Stepper motion engine.
///
/// Generic over:
/// - `PULSE`: step pulse generator
/// - `DIR`: direction line (must implement `OutputPin`)
/// - `EN`: driver enable line, active low (must implement `OutputPin`)
pub struct MotionEngine<PULSE, DIR, EN>
where
    PULSE: PulseGenerator,
    DIR: OutputPin,
    EN: OutputPin,
{
    pulse: PULSE,
    dir_pin: DIR,
    enable_pin: EN,
    config: MotionConfig,
    moves: MoveSettings,
    profile: MotionProfile,
}

impl<PULSE, DIR, EN> MotionEngine<PULSE, DIR, EN>
where
    PULSE: PulseGenerator,
    DIR: OutputPin,
    EN: OutputPin,
{
    /// Bind the engine to its hardware and resolved configuration.
    ///
    /// The driver is left de-energized.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::InvalidCurve` if the configured law cannot ramp
    /// from the start speed to the profile, init or service speed, or
    /// `MotionError::PinError` if the enable line cannot be driven.
    pub fn new(
        pulse: PULSE,
        dir_pin: DIR,
        mut enable_pin: EN,
        config: MotionConfig,
        moves: MoveSettings,
    ) -> Result<Self> {
        // Every cruise speed a named move can request
        let cruise = [
            config.max_speed,
            moves.init_max_speed as f32,
            moves.service_max_speed as f32,
        ];
        for max_speed in cruise {
            AccelCurve::new(
                config.law,
                config.min_speed,
                max_speed,
                config.acceleration,
                config.ramp_time_us,
            )?;
        }

        enable_pin.set_high().map_err(|_| MotionError::PinError)?;

        Ok(Self {
            pulse,
            dir_pin,
            enable_pin,
            profile: MotionProfile::new(config.acceleration, config.ramp_time_us),
            config,
            moves,
        })
    }

    /// Begin a move from idle.
    ///
    /// Does nothing while a move is in progress or a fault is latched.
    ///
    /// # Errors
    ///
    /// Returns a `MotionError` if the request is malformed or a control line
    /// cannot be driven. The engine stays idle in both cases.
    pub fn start_move(&mut self, request: &MoveRequest) -> Result<()> {
        match self.profile.mode() {
            Mode::Idle => {}
            Mode::Error => {
                warn!("move ignored: runaway fault latched");
                return Ok(());
            }
            _ => {
                debug!("move ignored: already moving");
                return Ok(());
            }
        }

        self.profile.begin(request)?;

        if let Err(e) = self.energize(request.direction) {
            self.profile.halt();
            return Err(e.into());
        }

        self.write_interval();
        self.pulse.start();

        debug!(
            "move started: {} steps, {}..{} steps/s",
            request.steps,
            request.min_speed,
            request.max_speed
        );
        Ok(())
    }

    fn energize(&mut self, direction: Direction) -> core::result::Result<(), MotionError> {
        self.drive_direction(direction)?;
        self.enable_pin.set_low().map_err(|_| MotionError::PinError)
    }

    fn drive_direction(&mut self, direction: Direction) -> core::result::Result<(), MotionError> {
        let high = (direction == Direction::Forward) != self.config.direction_inverted;
        let result = if high {
            self.dir_pin.set_high()
        } else {
            self.dir_pin.set_low()
        };
        result.map_err(|_| MotionError::PinError)
    }

    fn write_interval(&mut self) {
        // Out-of-range values keep the previous interval armed
        if let Some(ticks) = self.profile.interval_ticks(self.config.timer_clock_hz) {
            self.pulse.set_interval(ticks);
        }
    }

    /// Account one completed step pulse.
    ///
    /// Runs in the pulse interrupt: constant time, no allocation.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::PinError` if the direction line cannot be driven
    /// on a reversal; the motor is stopped first.
    pub fn on_step_pulse(&mut self) -> Result<()> {
        if !self.profile.is_active() {
            return Ok(());
        }

        match self.profile.advance() {
            StepAction::Continue => {}
            StepAction::Reverse => {
                self.change_direction()?;
                if !self.profile.is_active() {
                    return Ok(());
                }
            }
            StepAction::Stop => {
                self.stop();
                return Ok(());
            }
        }

        self.write_interval();
        Ok(())
    }

    /// Reverse the travel direction and restart the ramp.
    ///
    /// A second counted reversal in one move latches the runaway fault and
    /// stops the motor.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::PinError` if the direction line cannot be
    /// driven; the motor is stopped.
    pub fn change_direction(&mut self) -> Result<()> {
        self.profile.reverse();

        if self.profile.is_runaway() {
            error!("runaway: second reversal on an end-stop move");
            self.fault();
            return Ok(());
        }

        if let Err(e) = self.drive_direction(self.profile.direction()) {
            self.stop();
            return Err(e.into());
        }
        Ok(())
    }

    fn fault(&mut self) {
        self.pulse.stop();
        self.release_driver();
        self.profile.fault();
    }

    fn release_driver(&mut self) {
        if self.enable_pin.set_high().is_err() {
            warn!("enable line write failed");
        }
    }

    /// Stop the motor and de-energize the driver. No-op when idle.
    pub fn stop(&mut self) {
        if !self.profile.is_active() {
            return;
        }
        self.pulse.stop();
        self.release_driver();
        self.profile.halt();
        trace!("motor stopped at step {}", self.profile.current_step());
    }

    /// Shift the step counter by a signed offset.
    #[inline]
    pub fn correct_offset(&mut self, steps: i32) {
        self.profile.correct_offset(steps);
    }

    /// Ramp down from the current speed and stop at start speed.
    pub fn decelerate_and_stop(&mut self) {
        self.profile.begin_deceleration();
    }

    /// Clear a latched runaway fault.
    pub fn reset(&mut self) {
        if self.profile.mode() == Mode::Error {
            info!("runaway fault cleared");
            self.profile.clear_fault();
        }
    }

    /// Live profile state.
    #[inline]
    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    /// Engine configuration.
    #[inline]
    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Named move settings.
    #[inline]
    pub fn moves(&self) -> &MoveSettings {
        &self.moves
    }

    /// Current speed in steps/s.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.profile.speed()
    }

    /// Release the hardware.
    pub fn release(self) -> (PULSE, DIR, EN) {
        (self.pulse, self.dir_pin, self.enable_pin)
    }

    fn request(&self, direction: Direction, steps: i32, max_speed: f32, kind: MoveKind) -> MoveRequest {
        MoveRequest::new(
            direction,
            steps,
            self.config.min_speed,
            max_speed,
            self.config.law,
            kind,
        )
    }
}

impl<PULSE, DIR, EN> GridMotor for MotionEngine<PULSE, DIR, EN>
where
    PULSE: PulseGenerator,
    DIR: OutputPin,
    EN: OutputPin,
{
    fn mode(&self) -> Mode {
        self.profile.mode()
    }

    fn last_event(&self) -> MotorEvent {
        self.profile.last_event()
    }

    fn direction(&self) -> Direction {
        self.profile.direction()
    }

    fn is_moving(&self) -> bool {
        self.profile.is_active()
    }

    fn current_step(&self) -> i32 {
        self.profile.current_step()
    }

    fn steps_to_go(&self) -> i32 {
        self.profile.steps_to_go()
    }

    fn leg(&self) -> u32 {
        self.profile.leg()
    }

    fn accel_phase_time_us(&self) -> u32 {
        self.profile.accel_phase_time_us()
    }

    fn stop(&mut self) {
        MotionEngine::stop(self);
    }

    fn correct_offset(&mut self, steps: i32) {
        MotionEngine::correct_offset(self, steps);
    }

    fn decelerate_and_stop(&mut self) {
        MotionEngine::decelerate_and_stop(self);
    }

    fn move_by(&mut self, direction: Direction, steps: i32) -> Result<()> {
        let request = self.request(
            direction,
            steps,
            self.moves.init_max_speed as f32,
            MoveKind::Bounded,
        );
        self.start_move(&request)
    }

    fn move_to_end_stop(&mut self, direction: Direction, speed: MoveSpeed) -> Result<()> {
        let range = self.moves.total_range;
        let request = match speed {
            MoveSpeed::Slow => self.request(
                direction,
                range,
                self.moves.init_max_speed as f32,
                MoveKind::FullRange,
            ),
            MoveSpeed::Fast => self
                .request(
                    direction,
                    range,
                    self.moves.service_max_speed as f32,
                    MoveKind::FullRange,
                )
                .decelerate_at(self.moves.steps_before_decel),
        };
        self.start_move(&request)
    }

    fn press_switch(&mut self) -> Result<()> {
        let request = self.request(
            self.profile.direction(),
            self.moves.switch_press,
            self.config.min_speed,
            MoveKind::Bounded,
        );
        self.start_move(&request)
    }

    fn exposition(&mut self, direction: Direction) -> Result<()> {
        let request = self.request(
            direction,
            self.moves.expo_range,
            self.config.max_speed,
            MoveKind::Oscillation,
        );
        self.start_move(&request)
    }
}
