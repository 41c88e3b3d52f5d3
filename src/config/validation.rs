//! Configuration validation.

use crate::error::{ConfigError, Error, Result};
use crate::motion::AccelCurve;

use super::motion::SpeedProfile;
use super::units::FullSteps;
use super::RasterConfig;

/// Validate a grid configuration.
///
/// Checks:
/// - Every speed is positive and the start speed is below every cruise speed
/// - Accelerations and ramp times are positive
/// - Both acceleration laws can ramp to every cruise speed under both profiles
/// - Travel distances are positive and the park offset fits the oscillation leg
/// - The pulse timer clock is non-zero
pub fn validate_config(config: &RasterConfig) -> Result<()> {
    let v_min = config.initial_speed.value();
    if v_min <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidSpeed(v_min)));
    }

    validate_profile(v_min, &config.primary)?;
    validate_profile(v_min, &config.secondary)?;

    for max in [config.service_max_speed.value(), config.init_max_speed.value()] {
        if max <= v_min {
            return Err(Error::Config(ConfigError::InvalidSpeedRange { min: v_min, max }));
        }
    }

    validate_curves(config)?;
    validate_travel(config)?;

    if config.timing.timer_clock_hz == 0 {
        return Err(Error::Config(ConfigError::InvalidTimerClock));
    }

    Ok(())
}

fn validate_profile(v_min: f32, profile: &SpeedProfile) -> Result<()> {
    let max = profile.max_speed.value();
    if max <= v_min {
        return Err(Error::Config(ConfigError::InvalidSpeedRange { min: v_min, max }));
    }

    if profile.acceleration.value() <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidAcceleration(
            profile.acceleration.value(),
        )));
    }

    if profile.ramp_time_us == 0 {
        return Err(Error::Config(ConfigError::InvalidRampTime(profile.ramp_time_us)));
    }

    Ok(())
}

/// Every law and profile the boot switches can select must ramp to every
/// cruise speed a named move uses.
fn validate_curves(config: &RasterConfig) -> Result<()> {
    let ms = config.microsteps;
    let v_min = config.initial_speed.to_steps_per_sec(ms);

    for law in [config.primary_law, config.secondary_law] {
        for profile in [&config.primary, &config.secondary] {
            let acceleration = profile.acceleration.value() * ms.value() as f32;
            let cruise = [
                profile.max_speed,
                config.service_max_speed,
                config.init_max_speed,
            ];
            for max in cruise {
                let max = max.to_steps_per_sec(ms);
                if AccelCurve::new(law, v_min, max, acceleration, profile.ramp_time_us).is_err() {
                    return Err(Error::Config(ConfigError::UnsolvableCurve { law, max }));
                }
            }
        }
    }
    Ok(())
}

fn validate_travel(config: &RasterConfig) -> Result<()> {
    let t = &config.travel;
    let distances: [(&'static str, FullSteps); 7] = [
        ("total_range", t.total_range),
        ("steps_before_decel", t.steps_before_decel),
        ("expo_range", t.expo_range),
        ("expo_offset", t.expo_offset),
        ("switch_press", t.switch_press),
        ("run_out", t.run_out),
        ("test_move", t.test_move),
    ];

    for (name, distance) in distances {
        // Anything under one microstep rounds to a zero-length move
        if distance.to_steps(config.microsteps).value() <= 0 {
            return Err(Error::Config(ConfigError::InvalidDistance(name)));
        }
    }

    let offset = t.expo_offset.to_steps(config.microsteps).value();
    let range = t.expo_range.to_steps(config.microsteps).value();
    if offset >= range {
        return Err(Error::Config(ConfigError::InvalidExpoOffset { offset, range }));
    }

    Ok(())
}
