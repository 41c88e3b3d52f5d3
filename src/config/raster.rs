//! Top-level grid configuration and its boot-time resolution.

use serde::Deserialize;

use crate::motion::AccelLaw;

use super::motion::{MotionConfig, MoveSettings, SpeedProfile};
use super::units::{FullSteps, FullStepsPerSec, Microsteps};

/// Travel distances of the grid mechanism, in full steps.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TravelConfig {
    /// Full travel allowed before a switch is considered missed.
    pub total_range: FullSteps,
    /// Point of a fast end-to-end move where braking starts.
    pub steps_before_decel: FullSteps,
    /// Length of one oscillation leg.
    pub expo_range: FullSteps,
    /// Park-zone offset that centres the oscillation on the switch.
    pub expo_offset: FullSteps,
    /// Seating nudge after a switch is reached.
    pub switch_press: FullSteps,
    /// Run-out before a parking re-approach.
    pub run_out: FullSteps,
    /// Boot test move distance.
    pub test_move: FullSteps,
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            total_range: FullSteps(562.0),
            steps_before_decel: FullSteps(475.0),
            expo_range: FullSteps(18.75),
            expo_offset: FullSteps(9.375),
            switch_press: FullSteps(3.0),
            run_out: FullSteps(15.0),
            test_move: FullSteps(7.0),
        }
    }
}

/// Delays of the supervisory logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Delay before `in_motion` rises in a scanning exposure.
    pub in_motion_delay_ms: u16,
    /// Accel-phase time required before `in_motion` rises while oscillating.
    pub in_motion_min_accel_us: u32,
    /// Switch freeze after leaving an end-stop.
    pub freeze_ms: u16,
    /// Switch freeze covering the seating nudge.
    pub nudge_freeze_ms: u16,
    /// Input clock of the step pulse timer.
    pub timer_clock_hz: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            in_motion_delay_ms: 1,
            in_motion_min_accel_us: 1000,
            freeze_ms: 300,
            nudge_freeze_ms: 120,
            timer_clock_hz: 1_062_500,
        }
    }
}

/// Boot configuration switches, read once by the board layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DipSwitches {
    /// On: primary speed profile. Off: secondary.
    pub profile_select: bool,
    /// Oscillate during exposures instead of holding still.
    pub oscillation: bool,
    /// On: primary acceleration law. Off: secondary.
    pub accel_law_select: bool,
    /// Swap the direction line polarity.
    pub direction_inverted: bool,
}

/// Complete device configuration.
///
/// Every field has a default matching the production firmware, so an empty
/// TOML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RasterConfig {
    /// Driver microstep divisor.
    pub microsteps: Microsteps,
    /// Start speed of every move.
    pub initial_speed: FullStepsPerSec,
    /// Profile used with the profile switch on.
    pub primary: SpeedProfile,
    /// Profile used with the profile switch off.
    pub secondary: SpeedProfile,
    /// Law used with the law switch on.
    pub primary_law: AccelLaw,
    /// Law used with the law switch off.
    pub secondary_law: AccelLaw,
    /// Cruise speed of fast end-stop moves.
    pub service_max_speed: FullStepsPerSec,
    /// Cruise speed of slow end-stop and bounded moves.
    pub init_max_speed: FullStepsPerSec,
    /// Travel distances.
    pub travel: TravelConfig,
    /// Supervisory delays.
    pub timing: TimingConfig,
    /// Accept exposure requests while parked at home.
    pub exposure_at_home_allowed: bool,
    /// Nudge onto the switch after reaching an end-stop.
    pub seat_on_switch: bool,
    /// Invert the three input lines at board init.
    pub invert_inputs: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            microsteps: Microsteps::SIXTEENTH,
            initial_speed: FullStepsPerSec(31.25),
            primary: SpeedProfile::PRIMARY,
            secondary: SpeedProfile::SECONDARY,
            primary_law: AccelLaw::Parabolic,
            secondary_law: AccelLaw::ConstantPower,
            service_max_speed: FullStepsPerSec(150.0),
            init_max_speed: FullStepsPerSec(90.0),
            travel: TravelConfig::default(),
            timing: TimingConfig::default(),
            exposure_at_home_allowed: true,
            seat_on_switch: false,
            invert_inputs: true,
        }
    }
}

/// Supervisory settings consumed by the raster controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterSettings {
    /// Oscillate during exposures.
    pub oscillation_enabled: bool,
    /// Accept exposure requests at home.
    pub exposure_at_home_allowed: bool,
    /// Nudge onto the switch after an end-stop move.
    pub seat_on_switch: bool,
    /// Invert the input lines at board init.
    pub invert_inputs: bool,
    /// Scanning `in_motion` delay.
    pub in_motion_delay_ms: u16,
    /// Oscillation `in_motion` readiness threshold.
    pub in_motion_min_accel_us: u32,
    /// Switch freeze after leaving an end-stop.
    pub freeze_ms: u16,
    /// Switch freeze covering the seating nudge.
    pub nudge_freeze_ms: u16,
}

impl Default for RasterSettings {
    fn default() -> Self {
        RasterConfig::default()
            .resolve(DipSwitches::default())
            .raster
    }
}

/// Configuration with the DIP switches applied, in driver units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedConfig {
    /// Engine parameters.
    pub motion: MotionConfig,
    /// Named move distances and speeds.
    pub moves: MoveSettings,
    /// Controller settings.
    pub raster: RasterSettings,
}

impl RasterConfig {
    /// Apply the boot switches and convert every quantity to driver steps.
    pub fn resolve(&self, dip: DipSwitches) -> ResolvedConfig {
        let ms = self.microsteps;
        let profile = if dip.profile_select {
            &self.primary
        } else {
            &self.secondary
        };
        let law = if dip.accel_law_select {
            self.primary_law
        } else {
            self.secondary_law
        };

        let motion = MotionConfig {
            law,
            min_speed: self.initial_speed.to_steps_per_sec(ms),
            max_speed: profile.max_speed.to_steps_per_sec(ms),
            acceleration: profile.acceleration.value() * ms.value() as f32,
            ramp_time_us: profile.ramp_time_us,
            timer_clock_hz: self.timing.timer_clock_hz,
            direction_inverted: dip.direction_inverted,
        };

        let t = &self.travel;
        let moves = MoveSettings {
            total_range: t.total_range.to_steps(ms).value(),
            steps_before_decel: t.steps_before_decel.to_steps(ms).value(),
            expo_range: t.expo_range.to_steps(ms).value(),
            expo_offset: t.expo_offset.to_steps(ms).value(),
            switch_press: t.switch_press.to_steps(ms).value(),
            run_out: t.run_out.to_steps(ms).value(),
            test_move: t.test_move.to_steps(ms).value(),
            service_max_speed: libm::roundf(self.service_max_speed.to_steps_per_sec(ms)) as u32,
            init_max_speed: libm::roundf(self.init_max_speed.to_steps_per_sec(ms)) as u32,
        };

        let raster = RasterSettings {
            oscillation_enabled: dip.oscillation,
            exposure_at_home_allowed: self.exposure_at_home_allowed,
            seat_on_switch: self.seat_on_switch,
            invert_inputs: self.invert_inputs,
            in_motion_delay_ms: self.timing.in_motion_delay_ms,
            in_motion_min_accel_us: self.timing.in_motion_min_accel_us,
            freeze_ms: self.timing.freeze_ms,
            nudge_freeze_ms: self.timing.nudge_freeze_ms,
        };

        ResolvedConfig {
            motion,
            moves,
            raster,
        }
    }
}
