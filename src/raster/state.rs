//! Device states and continuation tags.

use crate::motion::{Direction, MoveSpeed};

/// Supervisory state of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Before the initial move has found an end-stop.
    Init,
    /// Bounded service leg in progress.
    ServiceMoving,
    /// Travelling toward the home switch.
    MovingHome,
    /// Travelling toward the in-field switch.
    MovingInField,
    /// Parked on the home switch.
    AtHome,
    /// Parked on the in-field switch.
    AtInField,
    /// Exposure without oscillation.
    Scanning,
    /// Exposure with oscillation.
    Oscillating,
    /// Exposure rejected or motor fault.
    Error,
}

/// Mechanical end-stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndStop {
    /// Home switch.
    Home,
    /// In-field switch.
    InField,
}

impl EndStop {
    /// Direction that travels toward this end-stop.
    #[inline]
    pub fn approach(self) -> Direction {
        match self {
            EndStop::Home => Direction::Backward,
            EndStop::InField => Direction::Forward,
        }
    }

    /// State of a grid parked on this end-stop.
    #[inline]
    pub fn parked_state(self) -> DeviceState {
        match self {
            EndStop::Home => DeviceState::AtHome,
            EndStop::InField => DeviceState::AtInField,
        }
    }

    /// State of a grid travelling toward this end-stop.
    #[inline]
    pub fn moving_state(self) -> DeviceState {
        match self {
            EndStop::Home => DeviceState::MovingHome,
            EndStop::InField => DeviceState::MovingInField,
        }
    }
}

/// Queued continuation, run once the motor is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PendingMove {
    /// Park offset done; start oscillating out of the park zone.
    StartOscillation(EndStop),
    /// Run out of the park zone, then re-approach the end-stop slowly.
    BackOffThenApproach(EndStop),
    /// Full-range approach to an end-stop.
    Approach(EndStop, MoveSpeed),
    /// Return leg of the boot test move.
    TestReturn,
}

/// Action run when the one-shot timer elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeferredTask {
    /// End the switch freeze window.
    UnfreezeSwitches,
    /// Raise `in_motion` for a scanning exposure.
    RaiseInMotionSignal,
}
