use garage_traits::{DigitalInput, Relay};
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

fn open_gpio() -> Result<Gpio> {
    Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))
}

/// Relay coil driven from a single output pin.
///
/// The output is forced to the idle level on construction and restored to
/// its previous mode when dropped.
pub struct GpioRelay {
    pin: OutputPin,
    number: u8,
    active_high: bool,
}

impl GpioRelay {
    pub fn new(pin: u8, active_high: bool) -> Result<Self> {
        let out = open_gpio()?
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open relay pin {pin}: {e}")))?
            .into_output();
        let mut relay = Self {
            pin: out,
            number: pin,
            active_high,
        };
        relay.write(false);
        debug!(pin, active_high, "relay ready");
        Ok(relay)
    }

    fn write(&mut self, on: bool) {
        if on == self.active_high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        trace!(pin = self.number, on, "relay write");
    }
}

impl Relay for GpioRelay {
    fn turn_on(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.write(true);
        Ok(())
    }

    fn turn_off(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.write(false);
        Ok(())
    }

    fn state(&self) -> bool {
        self.pin.is_set_high() == self.active_high
    }
}

/// Proximity switch on an input pin. Active-high inputs get a pull-down,
/// active-low inputs a pull-up, so an unwired pin reads inactive.
pub struct GpioInput {
    pin: InputPin,
    number: u8,
    active_high: bool,
}

impl GpioInput {
    pub fn new(pin: u8, active_high: bool) -> Result<Self> {
        let raw = open_gpio()?
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open sensor pin {pin}: {e}")))?;
        let input = if active_high {
            raw.into_input_pulldown()
        } else {
            raw.into_input_pullup()
        };
        debug!(pin, active_high, "sensor input ready");
        Ok(Self {
            pin: input,
            number: pin,
            active_high,
        })
    }

    pub fn pin(&self) -> u8 {
        self.number
    }

    /// Call `on_edge` from rppal's interrupt thread on every level change.
    /// The argument is the new reading with polarity applied; it is only a
    /// hint, the engine re-reads the pin before trusting it.
    pub fn watch<F>(&mut self, mut on_edge: F) -> Result<()>
    where
        F: FnMut(bool) + Send + 'static,
    {
        let active_high = self.active_high;
        let pin = self.number;
        self.pin
            .set_async_interrupt(Trigger::Both, move |level: Level| {
                on_edge((level == Level::High) == active_high)
            })
            .map_err(|e| HwError::Interrupt {
                pin,
                reason: e.to_string(),
            })
    }
}

impl DigitalInput for GpioInput {
    fn is_active(&self) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok((self.pin.read() == Level::High) == self.active_high)
    }
}
