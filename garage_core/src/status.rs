use crate::state::{CurrentState, TargetState};

/// Point-in-time view of the door for hosts and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorStatus {
    pub current: CurrentState,
    pub target: TargetState,
    pub stopped: bool,
    pub last_direction: Option<TargetState>,
    pub open_active: bool,
    pub closed_active: bool,
    /// A relay pulse sequence is still running.
    pub relay_busy: bool,
    /// The failure watchdog is armed.
    pub watchdog_armed: bool,
}

impl DoorStatus {
    /// `current=<State> target=<State>`, the line format the host prints.
    pub fn summary(&self) -> String {
        format!("current={} target={}", self.current, self.target)
    }
}
