//! Speed profiles and the resolved, engine-facing motion parameters.

use serde::Deserialize;

use crate::motion::AccelLaw;

use super::units::{FullSteps, FullStepsPerSec};

/// One DIP-selectable speed profile of the exposure motion.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedProfile {
    /// Cruise speed of exposure moves.
    pub max_speed: FullStepsPerSec,

    /// Speed increment per step of the parabolic law.
    pub acceleration: FullSteps,

    /// Ramp width of the time-based laws in microseconds.
    #[serde(default = "default_ramp_time_us")]
    pub ramp_time_us: u32,
}

fn default_ramp_time_us() -> u32 {
    40_000
}

impl SpeedProfile {
    /// Profile selected when the profile switch is on.
    pub const PRIMARY: Self = Self {
        max_speed: FullStepsPerSec(130.0),
        acceleration: FullSteps(2.5),
        ramp_time_us: 40_000,
    };

    /// Profile selected when the profile switch is off.
    pub const SECONDARY: Self = Self {
        max_speed: FullStepsPerSec(150.0),
        acceleration: FullSteps(3.5),
        ramp_time_us: 40_000,
    };
}

/// Parameters the motion engine is bound to at construction.
///
/// All speeds are in driver steps per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    /// Acceleration law of every ramp.
    pub law: AccelLaw,
    /// Start speed of every move.
    pub min_speed: f32,
    /// Cruise speed of exposure moves.
    pub max_speed: f32,
    /// Per-step increment of the parabolic law.
    pub acceleration: f32,
    /// Ramp width of the time-based laws in microseconds.
    pub ramp_time_us: u32,
    /// Pulse timer input clock.
    pub timer_clock_hz: u32,
    /// Swap the level driven on the direction line.
    pub direction_inverted: bool,
}

/// Distances and service speeds of the named grid moves, in driver steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveSettings {
    /// Budget of a full-range move; running out means a switch was missed.
    pub total_range: i32,
    /// Step at which a fast full-range move starts to brake.
    pub steps_before_decel: i32,
    /// Length of one oscillation leg.
    pub expo_range: i32,
    /// Distance into the park zone that centres the oscillation.
    pub expo_offset: i32,
    /// Seating nudge past a switch.
    pub switch_press: i32,
    /// Distance run out of the park zone before re-approaching.
    pub run_out: i32,
    /// Distance of the boot test move.
    pub test_move: i32,
    /// Cruise speed of fast end-stop moves, steps/s.
    pub service_max_speed: u32,
    /// Cruise speed of slow and bounded service moves, steps/s.
    pub init_max_speed: u32,
}
