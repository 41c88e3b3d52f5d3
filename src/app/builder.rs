//! Builder pattern for RasterApp.

use embedded_hal::digital::OutputPin;

use crate::config::{validate_config, DipSwitches, RasterConfig};
use crate::error::{ConfigError, Error, Result};
use crate::io::{InputBank, OneShotTimer, OutputBank, PulseGenerator};
use crate::motion::MotionEngine;
use crate::raster::RasterController;

use super::RasterApp;

/// Builder for creating RasterApp instances.
pub struct RasterAppBuilder<PULSE, DIR, EN, IN, OUT, TIM>
where
    PULSE: PulseGenerator,
    DIR: OutputPin,
    EN: OutputPin,
    IN: InputBank,
    OUT: OutputBank,
    TIM: OneShotTimer,
{
    config: RasterConfig,
    dip: DipSwitches,
    pulse: Option<PULSE>,
    dir_pin: Option<DIR>,
    enable_pin: Option<EN>,
    inputs: Option<IN>,
    outputs: Option<OUT>,
    timer: Option<TIM>,
}

impl<PULSE, DIR, EN, IN, OUT, TIM> Default for RasterAppBuilder<PULSE, DIR, EN, IN, OUT, TIM>
where
    PULSE: PulseGenerator,
    DIR: OutputPin,
    EN: OutputPin,
    IN: InputBank,
    OUT: OutputBank,
    TIM: OneShotTimer,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<PULSE, DIR, EN, IN, OUT, TIM> RasterAppBuilder<PULSE, DIR, EN, IN, OUT, TIM>
where
    PULSE: PulseGenerator,
    DIR: OutputPin,
    EN: OutputPin,
    IN: InputBank,
    OUT: OutputBank,
    TIM: OneShotTimer,
{
    /// Create a new builder with the production configuration.
    pub fn new() -> Self {
        Self {
            config: RasterConfig::default(),
            dip: DipSwitches::default(),
            pulse: None,
            dir_pin: None,
            enable_pin: None,
            inputs: None,
            outputs: None,
            timer: None,
        }
    }

    /// Use a configuration other than the defaults.
    pub fn config(mut self, config: RasterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the boot switch positions.
    pub fn dip_switches(mut self, dip: DipSwitches) -> Self {
        self.dip = dip;
        self
    }

    /// Set the step pulse generator.
    pub fn pulse(mut self, pulse: PULSE) -> Self {
        self.pulse = Some(pulse);
        self
    }

    /// Set the DIR pin.
    pub fn dir_pin(mut self, pin: DIR) -> Self {
        self.dir_pin = Some(pin);
        self
    }

    /// Set the driver ENABLE pin (active low).
    pub fn enable_pin(mut self, pin: EN) -> Self {
        self.enable_pin = Some(pin);
        self
    }

    /// Set the input bank.
    pub fn inputs(mut self, inputs: IN) -> Self {
        self.inputs = Some(inputs);
        self
    }

    /// Set the output bank.
    pub fn outputs(mut self, outputs: OUT) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Set the one-shot timer of the deferred task slot.
    pub fn timer(mut self, timer: TIM) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Build the RasterApp.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingComponent` if a part was not supplied,
    /// a validation error for an inconsistent configuration, or a motion
    /// error if the engine cannot be bound.
    pub fn build(self) -> Result<RasterApp<PULSE, DIR, EN, IN, OUT, TIM>> {
        let pulse = self.pulse.ok_or_else(|| missing("pulse"))?;
        let dir_pin = self.dir_pin.ok_or_else(|| missing("dir_pin"))?;
        let enable_pin = self.enable_pin.ok_or_else(|| missing("enable_pin"))?;
        let inputs = self.inputs.ok_or_else(|| missing("inputs"))?;
        let outputs = self.outputs.ok_or_else(|| missing("outputs"))?;
        let timer = self.timer.ok_or_else(|| missing("timer"))?;

        validate_config(&self.config)?;
        let resolved = self.config.resolve(self.dip);

        let engine = MotionEngine::new(pulse, dir_pin, enable_pin, resolved.motion, resolved.moves)?;
        let controller = RasterController::new(inputs, outputs, timer, resolved.raster, resolved.moves);

        Ok(RasterApp::new(engine, controller))
    }
}

fn missing(component: &'static str) -> Error {
    Error::Config(ConfigError::MissingComponent(component))
}
