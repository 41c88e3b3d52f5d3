//! Configuration module for raster-grid.
//!
//! Provides the TOML-facing [`RasterConfig`] (with `std` feature) and the
//! driver-unit settings it resolves to once the boot switches are known.

mod motion;
mod raster;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use motion::{MotionConfig, MoveSettings, SpeedProfile};
pub use raster::{
    DipSwitches, RasterConfig, RasterSettings, ResolvedConfig, TimingConfig, TravelConfig,
};
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{FullSteps, FullStepsPerSec, Microsteps, Steps};
