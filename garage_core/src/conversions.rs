//! `From` implementations bridging `garage_config` types to `garage_core` types.

use std::time::Duration;

use crate::config::DoorConfig;
use crate::state::TargetState;

impl From<garage_config::InitialState> for TargetState {
    fn from(s: garage_config::InitialState) -> Self {
        match s {
            garage_config::InitialState::Open => TargetState::Open,
            garage_config::InitialState::Closed => TargetState::Closed,
        }
    }
}

impl From<&garage_config::Config> for DoorConfig {
    fn from(c: &garage_config::Config) -> Self {
        Self {
            name: c.name.clone(),
            can_be_stopped: c.can_be_stopped,
            max_transition_time: Duration::from_secs(c.max_transition_time_s),
            cycle: Duration::from_millis(c.relay.cycle_ms),
            confirm_delay: Duration::from_millis(c.hardware.confirm_ms),
            initial_fallback_state: c.initial_fallback_state.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_units() {
        let cfg = garage_config::load_toml(
            "max_transition_time_s = 12\ninitial_fallback_state = \"open\"\n[relay]\npin = 4\ncycle_ms = 250\n",
        )
        .expect("parse");
        let door = DoorConfig::from(&cfg);
        assert_eq!(door.max_transition_time, Duration::from_secs(12));
        assert_eq!(door.cycle, Duration::from_millis(250));
        assert_eq!(door.confirm_delay, Duration::from_millis(100));
        assert_eq!(door.initial_fallback_state, TargetState::Open);
        assert_eq!(door.failure_timeout(), Duration::from_secs(17));
    }
}
