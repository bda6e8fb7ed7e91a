#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Garage door engine (hardware-agnostic).
//!
//! All hardware goes through `garage_traits::Relay` and
//! `garage_traits::DigitalInput`; time goes through `garage_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Sensors**: confirming (wired) and timed virtual variants (`sensor`)
//! - **Pulses**: on/off relay sequences (`pulse`)
//! - **Door**: state derivation, commands, sensor-driven transitions and the
//!   failure watchdog (`door`)
//! - **Events**: synchronous fan-out to subscribers (`events`)
//!
//! ## Timing
//!
//! Nothing here spawns threads or sleeps. Every timer is a [`timer::OneShot`]
//! deadline; the host waits until [`Door::next_deadline`] and calls
//! [`Door::poll`].

pub mod config;
pub mod conversions;
pub mod door;
pub mod error;
pub mod events;
pub mod hw_error;
pub mod pulse;
pub mod sensor;
pub mod state;
pub mod status;
pub mod timer;

pub use config::{DEFAULT_CONFIRM_DELAY, DoorConfig, FAILURE_TIMEOUT_LENIENCY};
pub use door::{Door, DoorBuilder};
pub use error::{BuildError, DoorError, Report, Result};
pub use events::DoorEvent;
pub use state::{CurrentState, DoorEnd, TargetState};
pub use status::DoorStatus;
