//! Unit tests for configuration validation.

use raster_grid::config::{parse_config, FullSteps, FullStepsPerSec, SpeedProfile};
use raster_grid::{validate_config, AccelLaw, ConfigError, Error, RasterConfig};

#[test]
fn test_defaults_are_valid() {
    assert!(validate_config(&RasterConfig::default()).is_ok());
}

#[test]
fn test_zero_start_speed() {
    let config = RasterConfig {
        initial_speed: FullStepsPerSec(0.0),
        ..RasterConfig::default()
    };
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidSpeed(_)))
    ));
}

#[test]
fn test_cruise_below_start_speed() {
    let config = RasterConfig {
        init_max_speed: FullStepsPerSec(20.0),
        ..RasterConfig::default()
    };
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidSpeedRange { .. }))
    ));

    let config = RasterConfig {
        secondary: SpeedProfile {
            max_speed: FullStepsPerSec(31.25),
            ..SpeedProfile::SECONDARY
        },
        ..RasterConfig::default()
    };
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidSpeedRange { .. }))
    ));
}

#[test]
fn test_zero_acceleration_and_ramp() {
    let mut config = RasterConfig::default();
    config.primary.acceleration = FullSteps(0.0);
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidAcceleration(_)))
    ));

    let mut config = RasterConfig::default();
    config.secondary.ramp_time_us = 0;
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidRampTime(0)))
    ));
}

#[test]
fn test_sub_microstep_distance() {
    let mut config = RasterConfig::default();
    config.travel.switch_press = FullSteps(0.01);
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidDistance("switch_press")))
    );
}

#[test]
fn test_offset_must_fit_leg() {
    let mut config = RasterConfig::default();
    config.travel.expo_offset = FullSteps(18.75);
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidExpoOffset {
            offset: 300,
            range: 300
        }))
    );
}

#[test]
fn test_zero_timer_clock() {
    let mut config = RasterConfig::default();
    config.timing.timer_clock_hz = 0;
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidTimerClock))
    );
}

/// Parsing validates too: a well-formed but inconsistent file is refused.
#[test]
fn test_parse_runs_validation() {
    let result = parse_config("[travel]\nrun_out = 0.0");
    assert_eq!(
        result,
        Err(Error::Config(ConfigError::InvalidDistance("run_out")))
    );
}

/// A sigmoid law on the unused switch position is still checked: a file that
/// selects it with a fast start speed cannot reach the slow boot speed.
#[test]
fn test_parse_refuses_unsolvable_sigmoid() {
    let result = parse_config("initial_speed = 50.0\nsecondary_law = \"sigmoid\"");
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::UnsolvableCurve {
            law: AccelLaw::Sigmoid,
            ..
        }))
    ));

    assert!(parse_config("secondary_law = \"sigmoid\"").is_ok());
}
