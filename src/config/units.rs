//! Unit types for travel distances and speeds.
//!
//! Configuration is written in full motor steps so that it survives a change
//! of driver microstepping; the engine works in microsteps. The newtypes here
//! keep the two apart until [`Microsteps`] scales one into the other.

use serde::Deserialize;

use crate::error::ConfigError;

/// Distance in full motor steps. Fractional values are allowed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct FullSteps(pub f32);

impl FullSteps {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// Convert to driver steps, rounding to the nearest microstep.
    #[inline]
    pub fn to_steps(self, microsteps: Microsteps) -> Steps {
        Steps(libm::roundf(self.0 * microsteps.value() as f32) as i32)
    }
}

/// Speed in full motor steps per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct FullStepsPerSec(pub f32);

impl FullStepsPerSec {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// Convert to driver steps per second.
    #[inline]
    pub fn to_steps_per_sec(self, microsteps: Microsteps) -> f32 {
        self.0 * microsteps.value() as f32
    }
}

/// Distance in driver steps (microsteps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Steps(pub i32);

impl Steps {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> i32 {
        self.0
    }
}

/// Microstep divisor (1, 2, 4, 8, 16, 32, 64, 128, 256).
///
/// Validated at construction to be a power of 2 within the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Microsteps(u16);

impl Microsteps {
    /// Sixteenth step.
    pub const SIXTEENTH: Self = Self(16);

    const VALID_VALUES: [u16; 9] = [1, 2, 4, 8, 16, 32, 64, 128, 256];

    /// Create a new Microsteps value with validation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMicrosteps` if the value is not a valid power of 2.
    pub fn new(value: u16) -> Result<Self, ConfigError> {
        if Self::VALID_VALUES.contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidMicrosteps(value))
        }
    }

    /// Get the raw divisor value.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl Default for Microsteps {
    fn default() -> Self {
        Self::SIXTEENTH
    }
}

impl<'de> Deserialize<'de> for Microsteps {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use core::fmt::Write;
        let value = u16::deserialize(deserializer)?;
        Microsteps::new(value).map_err(|e| {
            let mut buf = heapless::String::<128>::new();
            let _ = write!(buf, "{}", e);
            serde::de::Error::custom(buf.as_str())
        })
    }
}
