//! Unit test harness for raster-grid.
//!
//! Configuration tests that only need the public API.

mod config_parsing;
mod config_validation;
