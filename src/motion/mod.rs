//! Motion module for raster-grid.
//!
//! Provides the acceleration laws, the per-step velocity profile and the
//! interrupt-driven engine that applies it to the hardware.

mod accel;
mod engine;
mod profile;

pub use accel::{AccelCurve, AccelLaw};
pub use engine::{GridMotor, MotionEngine, MoveSpeed};
pub use profile::{
    Direction, Mode, MotionProfile, MotorEvent, MoveKind, MoveRequest, StepAction,
};
