//! Burner relay on a GPIO output.
//!
//! Active-high by default; boards that drive the relay through an
//! inverting transistor use [`BurnerRelay::active_low`].

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::RelayPort;

pub struct BurnerRelay<P: OutputPin> {
    pin: P,
    active_high: bool,
    on: bool,
}

impl<P: OutputPin> BurnerRelay<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            active_high: true,
            on: false,
        }
    }

    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_high: false,
            on: false,
        }
    }

    /// Last commanded state.
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> RelayPort for BurnerRelay<P> {
    fn set_burner(&mut self, on: bool) {
        let result = if on == self.active_high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.on = on,
            Err(e) => warn!("Burner relay write failed: {:?}", e),
        }
    }
}
