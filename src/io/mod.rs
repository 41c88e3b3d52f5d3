//! Hardware I/O boundary.
//!
//! The controller and the engine only see the traits in this module; boards
//! implement them over their own GPIO and timer peripherals.

mod signal;

use embedded_hal::digital::{InputPin, OutputPin};

pub use signal::{InputSignal, OutputSignal};

/// Discrete input lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Input {
    /// Exposure request from the host.
    ExpReq,
    /// Home end-stop switch.
    GridHome,
    /// In-field end-stop switch.
    GridInField,
}

impl Input {
    /// All input lines.
    pub const ALL: [Input; 3] = [Input::ExpReq, Input::GridHome, Input::GridInField];
}

/// Discrete output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Output {
    /// Grid sits on the home switch.
    Indication0,
    /// Fault indication.
    Indication1,
    /// Grid is moving at exposure speed.
    InMotion,
}

/// Input lines sampled once per supervisory pass.
pub trait InputBank {
    /// Sample every line.
    fn refresh(&mut self);

    /// Logical level of a line at the last refresh.
    fn is_high(&self, input: Input) -> bool;

    /// Set the polarity of a line.
    fn set_inverted(&mut self, input: Input, inverted: bool);
}

/// Fire-and-forget output lines.
pub trait OutputBank {
    /// Drive a line to a logical level.
    fn set(&mut self, output: Output, high: bool);

    /// Last requested level of a line.
    fn is_high(&self, output: Output) -> bool;
}

/// Hardware step pulse generator.
///
/// Each completed pulse must end up in `RasterApp::on_step_pulse`.
pub trait PulseGenerator {
    /// Start emitting pulses at the armed interval.
    fn start(&mut self);

    /// Stop emitting pulses.
    fn stop(&mut self);

    /// Arm the reload value, in timer ticks, for the next pulse.
    fn set_interval(&mut self, ticks: u16);
}

/// Single-shot millisecond timer backing the deferred task slot.
///
/// Expiry must end up in `RasterApp::on_deferred_elapsed`.
pub trait OneShotTimer {
    /// (Re)arm the timer. An armed timer restarts with the new delay.
    fn arm(&mut self, delay_ms: u16);

    /// Disarm the timer.
    fn cancel(&mut self);
}

/// [`InputBank`] over three embedded-hal input pins.
pub struct SignalInputs<E, H, F>
where
    E: InputPin,
    H: InputPin,
    F: InputPin,
{
    exp_req: InputSignal<E>,
    grid_home: InputSignal<H>,
    grid_in_field: InputSignal<F>,
}

impl<E, H, F> SignalInputs<E, H, F>
where
    E: InputPin,
    H: InputPin,
    F: InputPin,
{
    /// Bind the exposure request and the two end-stop switches.
    pub fn new(exp_req: E, grid_home: H, grid_in_field: F) -> Self {
        Self {
            exp_req: InputSignal::new(exp_req),
            grid_home: InputSignal::new(grid_home),
            grid_in_field: InputSignal::new(grid_in_field),
        }
    }
}

impl<E, H, F> InputBank for SignalInputs<E, H, F>
where
    E: InputPin,
    H: InputPin,
    F: InputPin,
{
    fn refresh(&mut self) {
        self.exp_req.refresh();
        self.grid_home.refresh();
        self.grid_in_field.refresh();
    }

    fn is_high(&self, input: Input) -> bool {
        match input {
            Input::ExpReq => self.exp_req.is_high(),
            Input::GridHome => self.grid_home.is_high(),
            Input::GridInField => self.grid_in_field.is_high(),
        }
    }

    fn set_inverted(&mut self, input: Input, inverted: bool) {
        match input {
            Input::ExpReq => self.exp_req.set_inverted(inverted),
            Input::GridHome => self.grid_home.set_inverted(inverted),
            Input::GridInField => self.grid_in_field.set_inverted(inverted),
        }
    }
}

/// [`OutputBank`] over three embedded-hal output pins.
pub struct SignalOutputs<A, B, C>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
{
    indication_0: OutputSignal<A>,
    indication_1: OutputSignal<B>,
    in_motion: OutputSignal<C>,
}

impl<A, B, C> SignalOutputs<A, B, C>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
{
    /// Bind the two indication lines and the in-motion line.
    pub fn new(indication_0: A, indication_1: B, in_motion: C) -> Self {
        Self {
            indication_0: OutputSignal::new(indication_0),
            indication_1: OutputSignal::new(indication_1),
            in_motion: OutputSignal::new(in_motion),
        }
    }
}

impl<A, B, C> OutputBank for SignalOutputs<A, B, C>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
{
    fn set(&mut self, output: Output, high: bool) {
        match output {
            Output::Indication0 => self.indication_0.set(high),
            Output::Indication1 => self.indication_1.set(high),
            Output::InMotion => self.in_motion.set(high),
        }
    }

    fn is_high(&self, output: Output) -> bool {
        match output {
            Output::Indication0 => self.indication_0.is_high(),
            Output::Indication1 => self.indication_1.is_high(),
            Output::InMotion => self.in_motion.is_high(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    #[test]
    fn test_inputs_dispatch_by_line() {
        let exp = PinMock::new(&[Transaction::get(State::Low)]);
        let home = PinMock::new(&[Transaction::get(State::Low)]);
        let field = PinMock::new(&[Transaction::get(State::High)]);
        let (mut e, mut h, mut f) = (exp.clone(), home.clone(), field.clone());

        let mut inputs = SignalInputs::new(exp, home, field);
        inputs.set_inverted(Input::GridHome, true);
        inputs.refresh();

        assert!(!inputs.is_high(Input::ExpReq));
        assert!(inputs.is_high(Input::GridHome));
        assert!(inputs.is_high(Input::GridInField));

        e.done();
        h.done();
        f.done();
    }

    #[test]
    fn test_outputs_dispatch_by_line() {
        let a = PinMock::new(&[]);
        let b = PinMock::new(&[Transaction::set(State::High)]);
        let c = PinMock::new(&[]);
        let (mut ha, mut hb, mut hc) = (a.clone(), b.clone(), c.clone());

        let mut outputs = SignalOutputs::new(a, b, c);
        outputs.set(Output::Indication1, true);
        assert!(outputs.is_high(Output::Indication1));
        assert!(!outputs.is_high(Output::InMotion));

        ha.done();
        hb.done();
        hc.done();
    }
}
