//! Concrete relay and sensor capabilities.
//!
//! - `sim`: in-memory relay and inputs, always available (tests, simulation backend).
//! - `gpio`: Raspberry Pi pins through rppal, behind the `hardware` feature.
pub mod error;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use error::HwError;
pub use garage_traits::{DigitalInput, Relay};
pub use sim::{SimInput, SimRelay};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::{GpioInput, GpioRelay};
