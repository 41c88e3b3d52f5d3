//! Unit tests for TOML configuration parsing.

use std::io::Write;

use raster_grid::config::{load_config, parse_config};
use raster_grid::{AccelLaw, ConfigError, DipSwitches, Error, RasterConfig};

/// A full production file parses back to the built-in defaults.
#[test]
fn test_parse_production_file() {
    let toml_str = r#"
microsteps = 16
initial_speed = 31.25
primary_law = "parabolic"
secondary_law = "constant_power"
service_max_speed = 150.0
init_max_speed = 90.0
exposure_at_home_allowed = true
seat_on_switch = false
invert_inputs = true

[primary]
max_speed = 130.0
acceleration = 2.5
ramp_time_us = 40000

[secondary]
max_speed = 150.0
acceleration = 3.5

[travel]
total_range = 562.0
steps_before_decel = 475.0
expo_range = 18.75
expo_offset = 9.375
switch_press = 3.0
run_out = 15.0
test_move = 7.0

[timing]
in_motion_delay_ms = 1
in_motion_min_accel_us = 1000
freeze_ms = 300
nudge_freeze_ms = 120
timer_clock_hz = 1062500
"#;

    let config = parse_config(toml_str).expect("Failed to parse TOML");
    assert_eq!(config, RasterConfig::default());
}

/// Partial tables keep the defaults of the fields they omit.
#[test]
fn test_partial_tables_keep_defaults() {
    let config = parse_config(
        r#"
[travel]
expo_range = 25.0

[secondary]
max_speed = 160.0
acceleration = 4.0
"#,
    )
    .unwrap();

    assert_eq!(config.travel.expo_range.value(), 25.0);
    assert_eq!(config.travel.expo_offset.value(), 9.375);
    assert_eq!(config.secondary.ramp_time_us, 40_000);
    assert_eq!(config.primary, RasterConfig::default().primary);
}

/// Every acceleration law is spelled in snake case.
#[test]
fn test_parse_all_laws() {
    for (name, law) in [
        ("linear", AccelLaw::Linear),
        ("constant_power", AccelLaw::ConstantPower),
        ("parabolic", AccelLaw::Parabolic),
        ("sigmoid", AccelLaw::Sigmoid),
    ] {
        let config = parse_config(&format!("secondary_law = \"{}\"", name)).unwrap();
        assert_eq!(config.secondary_law, law);
    }

    let result = parse_config("secondary_law = \"cubic\"");
    assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
}

/// Microstep divisors outside the driver's set are refused.
#[test]
fn test_parse_invalid_microsteps() {
    let result = parse_config("microsteps = 3");
    assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
}

/// A speed profile must name both its speed and its acceleration.
#[test]
fn test_profile_requires_speed_and_acceleration() {
    let result = parse_config("[primary]\nmax_speed = 120.0");
    assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
}

/// Overrides flow through to the resolved driver units.
#[test]
fn test_overrides_resolve_in_driver_units() {
    let config = parse_config("microsteps = 8\n[travel]\nrun_out = 20.0").unwrap();
    let resolved = config.resolve(DipSwitches::default());

    assert_eq!(resolved.moves.run_out, 160);
    assert_eq!(resolved.motion.min_speed, 250.0);
    assert_eq!(resolved.motion.max_speed, 1200.0);
}

/// Loading reads and validates a file on disk.
#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("raster-grid-{}.toml", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "seat_on_switch = true").unwrap();
        writeln!(file, "[timing]").unwrap();
        writeln!(file, "nudge_freeze_ms = 150").unwrap();
    }

    let config = load_config(&path);
    std::fs::remove_file(&path).unwrap();

    let config = config.unwrap();
    assert!(config.seat_on_switch);
    assert_eq!(config.timing.nudge_freeze_ms, 150);
}
