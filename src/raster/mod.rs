//! Raster module for raster-grid.
//!
//! Provides the supervisory state machine, its states and continuations,
//! and the single-slot deferred task scheduler it drives.

mod controller;
mod deferred;
mod state;

pub use controller::{RasterController, RasterStatus};
pub use deferred::DeferredScheduler;
pub use state::{DeferredTask, DeviceState, EndStop, PendingMove};
