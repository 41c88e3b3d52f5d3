//! Error types for raster-grid.
//!
//! Provides unified error handling across configuration, the motion engine
//! and the raster state machine.

use core::fmt;

use crate::motion::AccelLaw;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all raster-grid operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Motion engine error
    Motion(MotionError),
    /// Fault raised by the raster state machine
    Raster(RasterFault),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Invalid microstep value (must be power of 2: 1, 2, 4, 8, 16, 32, 64, 128, 256)
    InvalidMicrosteps(u16),
    /// A speed that must be positive is not
    InvalidSpeed(f32),
    /// Minimum speed is not below the maximum speed
    InvalidSpeedRange {
        /// Minimum (start) speed in steps/s
        min: f32,
        /// Maximum speed in steps/s
        max: f32,
    },
    /// Acceleration increment must be > 0
    InvalidAcceleration(f32),
    /// Ramp time must be > 0
    InvalidRampTime(u32),
    /// A travel distance must be > 0
    InvalidDistance(&'static str),
    /// Park-zone offset must be smaller than the oscillation range
    InvalidExpoOffset {
        /// Offset into the park zone in steps
        offset: i32,
        /// Oscillation range in steps
        range: i32,
    },
    /// An acceleration law cannot ramp from the start speed to a cruise speed
    UnsolvableCurve {
        /// Law selected by the boot switches
        law: AccelLaw,
        /// Cruise speed in steps/s
        max: f32,
    },
    /// Pulse timer clock must be > 0
    InvalidTimerClock,
    /// A builder was finished without a required component
    MissingComponent(&'static str),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Motion engine errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Direction or enable line could not be driven
    PinError,
    /// Acceleration curve coefficients are not usable for the requested speeds
    InvalidCurve(AccelLaw),
    /// Move request is malformed
    InvalidMove {
        /// Requested step count
        steps: i32,
    },
}

/// Faults surfaced by the raster state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RasterFault {
    /// The motor reversed more than once in a bounded move: a limit switch
    /// was missed or the mechanism jammed. Halts the device.
    LimitSwitch,
    /// Exposure was requested at an end-stop configured to refuse it.
    /// Cleared once the request drops.
    ExposureAtDisallowedPosition,
}

impl RasterFault {
    /// Whether the fault halts the device until an external reset.
    #[inline]
    pub fn is_fatal(self) -> bool {
        matches!(self, RasterFault::LimitSwitch)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Motion(e) => write!(f, "Motion error: {}", e),
            Error::Raster(e) => write!(f, "Raster fault: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "Invalid microsteps: {}. Valid values: 1, 2, 4, 8, 16, 32, 64, 128, 256", v)
            }
            ConfigError::InvalidSpeed(v) => write!(f, "Invalid speed: {}. Must be > 0", v),
            ConfigError::InvalidSpeedRange { min, max } => {
                write!(f, "Invalid speed range: min ({}) must be < max ({})", min, max)
            }
            ConfigError::InvalidAcceleration(v) => write!(f, "Invalid acceleration: {}. Must be > 0", v),
            ConfigError::InvalidRampTime(v) => write!(f, "Invalid ramp time: {} us. Must be > 0", v),
            ConfigError::InvalidDistance(name) => write!(f, "Invalid distance '{}': must be > 0", name),
            ConfigError::InvalidExpoOffset { offset, range } => {
                write!(f, "Expo offset {} must be smaller than expo range {}", offset, range)
            }
            ConfigError::UnsolvableCurve { law, max } => {
                write!(f, "No {:?} ramp from the start speed to {} steps/s", law, max)
            }
            ConfigError::InvalidTimerClock => write!(f, "Pulse timer clock must be > 0"),
            ConfigError::MissingComponent(name) => write!(f, "Missing component: {}", name),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionError::PinError => write!(f, "GPIO pin operation failed"),
            MotionError::InvalidCurve(law) => {
                write!(f, "No valid {:?} curve for the requested speeds", law)
            }
            MotionError::InvalidMove { steps } => write!(f, "Invalid move of {} steps", steps),
        }
    }
}

impl fmt::Display for RasterFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterFault::LimitSwitch => write!(f, "limit switch missed, motor halted"),
            RasterFault::ExposureAtDisallowedPosition => {
                write!(f, "exposure requested at a disallowed position")
            }
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<MotionError> for Error {
    fn from(e: MotionError) -> Self {
        Error::Motion(e)
    }
}

impl From<RasterFault> for Error {
    fn from(e: RasterFault) -> Self {
        Error::Raster(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for MotionError {}

#[cfg(feature = "std")]
impl std::error::Error for RasterFault {}
