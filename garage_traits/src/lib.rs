//! Capability traits shared by the door engine, the hardware backends and the host.
//!
//! The engine never touches pins directly: it drives a [`Relay`] and observes
//! [`DigitalInput`]s, and measures time through a [`Clock`].
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Output that closes a relay contact while "on".
pub trait Relay {
    fn turn_on(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn turn_off(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    /// Whether the contact is currently closed (polarity already applied).
    fn state(&self) -> bool;
}

/// Binary input, e.g. a proximity switch at one end of the door travel.
pub trait DigitalInput {
    /// Current reading with the configured polarity applied (`true` = sensor triggered).
    fn is_active(&self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

impl<R: Relay + ?Sized> Relay for Box<R> {
    fn turn_on(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).turn_on()
    }

    fn turn_off(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).turn_off()
    }

    fn state(&self) -> bool {
        (**self).state()
    }
}

impl<I: DigitalInput + ?Sized> DigitalInput for Box<I> {
    fn is_active(&self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).is_active()
    }
}
