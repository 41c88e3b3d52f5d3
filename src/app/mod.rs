//! Application root.
//!
//! [`RasterApp`] owns the single motion engine and the single raster
//! controller. Each interrupt entry point takes `&self` and does its whole
//! read-modify-write inside one critical section, so the app can live in a
//! `static` and be shared by the pulse, tick and deferred-timer handlers.

mod builder;

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::OutputPin;

use crate::error::Result;
use crate::io::{InputBank, OneShotTimer, OutputBank, PulseGenerator};
use crate::motion::{Direction, Mode, MotionEngine, MotorEvent};
use crate::raster::{RasterController, RasterStatus};

pub use builder::RasterAppBuilder;

/// Snapshot of the motion engine for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStatus {
    /// Ramp phase.
    pub mode: Mode,
    /// Travel direction.
    pub direction: Direction,
    /// Speed in steps/s.
    pub speed: f32,
    /// Steps taken in the current leg.
    pub current_step: i32,
    /// Step budget of one leg.
    pub steps_to_go: i32,
    /// Most recent motor event.
    pub last_event: MotorEvent,
}

/// The grid drive: one engine, one controller.
pub struct RasterApp<PULSE, DIR, EN, IN, OUT, TIM>
where
    PULSE: PulseGenerator,
    DIR: OutputPin,
    EN: OutputPin,
    IN: InputBank,
    OUT: OutputBank,
    TIM: OneShotTimer,
{
    engine: Mutex<RefCell<MotionEngine<PULSE, DIR, EN>>>,
    controller: Mutex<RefCell<RasterController<IN, OUT, TIM>>>,
}

impl<PULSE, DIR, EN, IN, OUT, TIM> RasterApp<PULSE, DIR, EN, IN, OUT, TIM>
where
    PULSE: PulseGenerator,
    DIR: OutputPin,
    EN: OutputPin,
    IN: InputBank,
    OUT: OutputBank,
    TIM: OneShotTimer,
{
    /// Assemble the app from its two parts.
    pub const fn new(
        engine: MotionEngine<PULSE, DIR, EN>,
        controller: RasterController<IN, OUT, TIM>,
    ) -> Self {
        Self {
            engine: Mutex::new(RefCell::new(engine)),
            controller: Mutex::new(RefCell::new(controller)),
        }
    }

    /// Start building an app.
    pub fn builder() -> RasterAppBuilder<PULSE, DIR, EN, IN, OUT, TIM> {
        RasterAppBuilder::new()
    }

    /// Boot sequence. Call once, before the tick starts.
    ///
    /// # Errors
    ///
    /// Propagates motor errors from the boot move.
    pub fn board_init(&self, test_move: bool) -> Result<()> {
        critical_section::with(|cs| {
            let mut engine = self.engine.borrow_ref_mut(cs);
            let mut controller = self.controller.borrow_ref_mut(cs);
            controller.board_init(&mut *engine, test_move)
        })
    }

    /// Step pulse completion handler.
    ///
    /// # Errors
    ///
    /// Propagates direction line failures; the motor is already stopped.
    pub fn on_step_pulse(&self) -> Result<()> {
        critical_section::with(|cs| self.engine.borrow_ref_mut(cs).on_step_pulse())
    }

    /// Board tick handler (about 1 kHz).
    ///
    /// # Errors
    ///
    /// Returns the fatal fault on every tick once the device has halted.
    pub fn on_tick(&self) -> Result<()> {
        critical_section::with(|cs| {
            let mut engine = self.engine.borrow_ref_mut(cs);
            let mut controller = self.controller.borrow_ref_mut(cs);
            controller.update(&mut *engine)
        })
    }

    /// One-shot timer expiry handler.
    pub fn on_deferred_elapsed(&self) {
        critical_section::with(|cs| self.controller.borrow_ref_mut(cs).on_deferred_elapsed());
    }

    /// Debounced grid button press.
    ///
    /// # Errors
    ///
    /// Propagates motor errors.
    pub fn on_grid_button(&self) -> Result<()> {
        critical_section::with(|cs| {
            let mut engine = self.engine.borrow_ref_mut(cs);
            let mut controller = self.controller.borrow_ref_mut(cs);
            controller.on_grid_button(&mut *engine)
        })
    }

    /// Motion engine snapshot.
    pub fn motion_status(&self) -> MotionStatus {
        critical_section::with(|cs| {
            let engine = self.engine.borrow_ref(cs);
            let profile = engine.profile();
            MotionStatus {
                mode: profile.mode(),
                direction: profile.direction(),
                speed: profile.speed(),
                current_step: profile.current_step(),
                steps_to_go: profile.steps_to_go(),
                last_event: profile.last_event(),
            }
        })
    }

    /// Raster controller snapshot.
    pub fn raster_status(&self) -> RasterStatus {
        critical_section::with(|cs| self.controller.borrow_ref(cs).status())
    }

    /// Release both parts.
    pub fn into_parts(
        self,
    ) -> (
        MotionEngine<PULSE, DIR, EN>,
        RasterController<IN, OUT, TIM>,
    ) {
        (
            self.engine.into_inner().into_inner(),
            self.controller.into_inner().into_inner(),
        )
    }
}
