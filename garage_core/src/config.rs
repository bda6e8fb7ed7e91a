//! Runtime configuration of the door engine.
//!
//! Separate from the TOML-deserialized config in `garage_config`; see
//! `conversions` for the mapping.

use std::time::Duration;

use crate::state::TargetState;

/// Extra time granted on top of `max_transition_time` before a transition
/// is declared failed. Covers the virtual sensor firing exactly at the
/// nominal travel time.
pub const FAILURE_TIMEOUT_LENIENCY: Duration = Duration::from_secs(5);

/// Delay between a raw sensor edge and the read that confirms it.
pub const DEFAULT_CONFIRM_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct DoorConfig {
    /// Label used in logs.
    pub name: String,
    /// A pulse while moving halts the door; required for stop and reverse.
    pub can_be_stopped: bool,
    /// Nominal end-to-end travel time.
    pub max_transition_time: Duration,
    /// One half (on or off) of a relay pulse.
    pub cycle: Duration,
    pub confirm_delay: Duration,
    /// Assumed position when no sensor can tell.
    pub initial_fallback_state: TargetState,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            name: "Garage Door".to_string(),
            can_be_stopped: true,
            max_transition_time: Duration::from_secs(30),
            cycle: Duration::from_millis(600),
            confirm_delay: DEFAULT_CONFIRM_DELAY,
            initial_fallback_state: TargetState::Closed,
        }
    }
}

impl DoorConfig {
    /// Watchdog window armed at the start of every transition.
    pub fn failure_timeout(&self) -> Duration {
        self.max_transition_time + FAILURE_TIMEOUT_LENIENCY
    }
}
