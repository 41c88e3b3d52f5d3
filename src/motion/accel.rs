//! Acceleration laws.
//!
//! Each law maps the elapsed accel-phase time (or the step count, for the
//! parabolic law) to a speed between the move's start and cruise speeds.
//! Coefficients are solved once per move in [`AccelCurve::new`] so the
//! per-step evaluation stays a handful of float operations.

use libm::{fabsf, sqrtf};
use serde::Deserialize;

use crate::error::MotionError;

/// Sigmoid centre divisor: the inflection sits at `T / k3`.
const SIGMOID_CENTER_DIVISOR: f32 = 2.0;

/// Fixed-point passes used to fit the sigmoid to both ends of the ramp.
const SIGMOID_FIT_PASSES: usize = 4;

/// Selectable acceleration law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelLaw {
    /// `V = k·t + Vmin`
    Linear,
    /// `V = k·sqrt(t) + Vmin`
    ConstantPower,
    /// `V += A` per step while accelerating, `V -= A` while decelerating.
    #[default]
    Parabolic,
    /// Logistic-style S-curve centred at `T / k3`.
    Sigmoid,
}

/// Fitted coefficients of the sigmoid law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sigmoid {
    k2: f32,
    x_offset: f32,
    y_offset: f32,
}

impl Sigmoid {
    #[inline]
    fn core(&self, x: f32) -> f32 {
        x / (self.k2 + fabsf(x))
    }

    /// Fit the curve so that `V(0) = vmin` and `V(T) = vmax`.
    fn fit(ramp_time_us: f32, vmin: f32, vmax: f32) -> Option<Self> {
        let x_offset = ramp_time_us / SIGMOID_CENTER_DIVISOR;
        let mut curve = Self {
            k2: 1.0,
            x_offset,
            y_offset: vmax / 2.0,
        };

        for _ in 0..SIGMOID_FIT_PASSES {
            let ratio = vmin / curve.y_offset;
            if !(ratio > 0.0 && ratio < 1.0) {
                return None;
            }
            curve.k2 = x_offset * ratio / (1.0 - ratio);
            let k1 = 1.0 / (curve.core(ramp_time_us - x_offset) + 1.0);
            curve.y_offset = k1 * vmax;
        }

        let usable = curve.k2.is_finite()
            && curve.k2 > 0.0
            && curve.y_offset.is_finite()
            && curve.y_offset > 0.0;
        usable.then_some(curve)
    }

    #[inline]
    fn speed_at(&self, t_us: f32) -> f32 {
        self.y_offset * self.core(t_us - self.x_offset) + self.y_offset
    }
}

/// An acceleration law bound to concrete speeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccelCurve {
    /// Start and cruise speeds are equal; no ramp.
    Flat,
    /// Linear in time.
    Linear {
        /// Slope in steps/s per microsecond.
        k: f32,
    },
    /// Square root of time.
    ConstantPower {
        /// Gain in steps/s per sqrt(microsecond).
        k: f32,
    },
    /// Fixed increment per step.
    Parabolic {
        /// Speed change per step in steps/s.
        increment: f32,
    },
    /// S-curve in time.
    Sigmoid(Sigmoid),
}

impl AccelCurve {
    /// Solve the curve for a move.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::InvalidCurve` if the law cannot span the requested
    /// speeds with the given constants.
    pub fn new(
        law: AccelLaw,
        min_speed: f32,
        max_speed: f32,
        acceleration: f32,
        ramp_time_us: u32,
    ) -> Result<Self, MotionError> {
        if max_speed <= min_speed {
            return Ok(AccelCurve::Flat);
        }

        let span = max_speed - min_speed;
        let ramp = ramp_time_us as f32;

        let curve = match law {
            AccelLaw::Linear if ramp_time_us > 0 => AccelCurve::Linear { k: span / ramp },
            AccelLaw::ConstantPower if ramp_time_us > 0 => AccelCurve::ConstantPower {
                k: span / sqrtf(ramp),
            },
            AccelLaw::Parabolic if acceleration > 0.0 => AccelCurve::Parabolic {
                increment: acceleration,
            },
            AccelLaw::Sigmoid if ramp_time_us > 0 => {
                let fitted = Sigmoid::fit(ramp, min_speed, max_speed)
                    .ok_or(MotionError::InvalidCurve(law))?;
                AccelCurve::Sigmoid(fitted)
            }
            _ => return Err(MotionError::InvalidCurve(law)),
        };

        Ok(curve)
    }

    /// Whether the curve is driven by elapsed time rather than step count.
    #[inline]
    pub fn is_time_based(&self) -> bool {
        matches!(
            self,
            AccelCurve::Linear { .. } | AccelCurve::ConstantPower { .. } | AccelCurve::Sigmoid(_)
        )
    }

    #[inline]
    fn raw_speed(&self, current: f32, t_us: f32, min_speed: f32, sign: f32) -> f32 {
        match *self {
            AccelCurve::Flat => min_speed,
            AccelCurve::Linear { k } => k * t_us + min_speed,
            AccelCurve::ConstantPower { k } => k * sqrtf(t_us) + min_speed,
            AccelCurve::Parabolic { increment } => current + sign * increment,
            AccelCurve::Sigmoid(ref s) => s.speed_at(t_us),
        }
    }

    /// Next speed while accelerating. Never below `current`.
    #[inline]
    pub fn accelerate(&self, current: f32, t_us: f32, min_speed: f32, max_speed: f32) -> f32 {
        self.raw_speed(current, t_us, min_speed, 1.0)
            .max(current)
            .clamp(min_speed, max_speed)
    }

    /// Next speed while decelerating. Never above `current`.
    #[inline]
    pub fn decelerate(&self, current: f32, t_us: f32, min_speed: f32, max_speed: f32) -> f32 {
        self.raw_speed(current, t_us, min_speed, -1.0)
            .min(current)
            .clamp(min_speed, max_speed)
    }
}
