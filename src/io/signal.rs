//! Logic signal wrappers over embedded-hal pins.
//!
//! Both wrappers work in *logical* levels: the polarity flag is applied at
//! the pin, so callers never see the electrical level.

use embedded_hal::digital::{InputPin, OutputPin};

/// Input line with optional polarity inversion and a cached level.
///
/// The pin is sampled only by [`InputSignal::refresh`], so every check made
/// within one supervisory pass sees the same value.
pub struct InputSignal<P: InputPin> {
    pin: P,
    inverted: bool,
    level: bool,
}

impl<P: InputPin> InputSignal<P> {
    /// Wrap a pin. Starts non-inverted and low.
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            inverted: false,
            level: false,
        }
    }

    /// Set the polarity inversion flag.
    #[inline]
    pub fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    /// Whether the line is inverted.
    #[inline]
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Sample the pin. A failed read keeps the previous level.
    pub fn refresh(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => self.level = high != self.inverted,
            Err(_) => warn!("input read failed, keeping last level"),
        }
        self.level
    }

    /// Logical level at the last refresh.
    #[inline]
    pub fn is_high(&self) -> bool {
        self.level
    }

    /// Release the pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

/// Output line with optional polarity inversion and a cached level.
pub struct OutputSignal<P: OutputPin> {
    pin: P,
    inverted: bool,
    level: bool,
}

impl<P: OutputPin> OutputSignal<P> {
    /// Wrap a pin. The pin is not touched until the first [`set`](Self::set).
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            inverted: false,
            level: false,
        }
    }

    /// Set the polarity inversion flag.
    #[inline]
    pub fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    /// Drive the line to a logical level.
    ///
    /// Fire-and-forget: a failed write is logged and the cache still follows
    /// the request.
    pub fn set(&mut self, high: bool) {
        let electrical = high != self.inverted;
        let result = if electrical {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            warn!("output write failed");
        }
        self.level = high;
    }

    /// Last requested logical level.
    #[inline]
    pub fn is_high(&self) -> bool {
        self.level
    }

    /// Release the pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}
