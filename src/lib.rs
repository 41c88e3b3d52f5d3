//! # raster-grid
//!
//! Stepper-driven raster grid controller with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Interrupt-driven motion**: a new step interval is computed on every
//!   pulse, in constant time, with one of four acceleration laws
//! - **Supervisory state machine**: end-stop switches, exposure requests and
//!   multi-leg continuations sequenced from a ~1 kHz tick
//! - **Runaway detection**: a bounded move that reverses twice halts the device
//! - **no_std compatible**: core library works without standard library
//! - **Configuration-driven**: production defaults, overridable from TOML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use raster_grid::{DipSwitches, RasterApp, SignalInputs, SignalOutputs};
//!
//! let app = RasterApp::builder()
//!     .dip_switches(DipSwitches { profile_select: true, ..Default::default() })
//!     .pulse(step_timer)
//!     .dir_pin(dir)
//!     .enable_pin(enable)
//!     .inputs(SignalInputs::new(exp_req, home, in_field))
//!     .outputs(SignalOutputs::new(ind0, ind1, in_motion))
//!     .timer(task_timer)
//!     .build()?;
//!
//! app.board_init(false)?;
//!
//! // From the interrupt handlers:
//! app.on_step_pulse()?;
//! app.on_tick()?;
//! app.on_deferred_elapsed();
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `defmt`: Enables defmt logging for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[cfg(all(not(feature = "std"), test))]
#[macro_use]
extern crate std;

// Must come first: the logging macros are textually scoped
#[macro_use]
mod fmt;

// Core modules
pub mod app;
pub mod config;
pub mod error;
pub mod io;
pub mod motion;
pub mod raster;

#[cfg(test)]
mod testing;

// Re-exports for ergonomic API
pub use app::{MotionStatus, RasterApp, RasterAppBuilder};
pub use config::{validate_config, DipSwitches, RasterConfig, ResolvedConfig};
pub use error::{ConfigError, Error, MotionError, RasterFault, Result};
pub use io::{
    Input, InputBank, InputSignal, OneShotTimer, Output, OutputBank, OutputSignal,
    PulseGenerator, SignalInputs, SignalOutputs,
};
pub use motion::{AccelLaw, Direction, GridMotor, Mode, MotionEngine, MotorEvent, MoveSpeed};
pub use raster::{DeviceState, EndStop, PendingMove, RasterController, RasterStatus};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{FullSteps, FullStepsPerSec, Microsteps, Steps};
