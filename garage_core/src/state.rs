//! Door position vocabulary.

use core::fmt;

use crate::events::DoorEvent;

/// Last commanded or deduced destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    Open,
    Closed,
}

/// Position as derived from the sensors and the two control fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurrentState {
    Open,
    Closed,
    Opening,
    Closing,
    Stopped,
}

/// One end of the door travel; each end has exactly one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorEnd {
    Open,
    Closed,
}

impl TargetState {
    pub fn opposite(self) -> Self {
        match self {
            TargetState::Open => TargetState::Closed,
            TargetState::Closed => TargetState::Open,
        }
    }

    /// Moving state on the way to this target.
    pub fn via(self) -> CurrentState {
        match self {
            TargetState::Open => CurrentState::Opening,
            TargetState::Closed => CurrentState::Closing,
        }
    }

    /// End whose sensor confirms arrival.
    pub fn end(self) -> DoorEnd {
        match self {
            TargetState::Open => DoorEnd::Open,
            TargetState::Closed => DoorEnd::Closed,
        }
    }

    pub(crate) fn moving_event(self) -> DoorEvent {
        match self {
            TargetState::Open => DoorEvent::Opening,
            TargetState::Closed => DoorEvent::Closing,
        }
    }

    pub(crate) fn reached_event(self) -> DoorEvent {
        match self {
            TargetState::Open => DoorEvent::Opened,
            TargetState::Closed => DoorEvent::Closed,
        }
    }
}

impl DoorEnd {
    pub fn opposite(self) -> Self {
        match self {
            DoorEnd::Open => DoorEnd::Closed,
            DoorEnd::Closed => DoorEnd::Open,
        }
    }

    /// Terminal position reported while this end's sensor is active.
    pub fn position(self) -> TargetState {
        match self {
            DoorEnd::Open => TargetState::Open,
            DoorEnd::Closed => TargetState::Closed,
        }
    }
}

impl From<TargetState> for CurrentState {
    fn from(t: TargetState) -> Self {
        match t {
            TargetState::Open => CurrentState::Open,
            TargetState::Closed => CurrentState::Closed,
        }
    }
}

impl CurrentState {
    /// Open or Closed, i.e. confirmed by a sensor.
    pub fn is_terminal(self) -> bool {
        matches!(self, CurrentState::Open | CurrentState::Closed)
    }

    pub fn is_moving(self) -> bool {
        matches!(self, CurrentState::Opening | CurrentState::Closing)
    }
}

impl fmt::Display for CurrentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CurrentState::Open => "Open",
            CurrentState::Closed => "Closed",
            CurrentState::Opening => "Opening",
            CurrentState::Closing => "Closing",
            CurrentState::Stopped => "Stopped",
        })
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        CurrentState::from(*self).fmt(f)
    }
}

impl fmt::Display for DoorEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DoorEnd::Open => "open",
            DoorEnd::Closed => "closed",
        })
    }
}

/// Derive the current position.
///
/// Neither sensor active: `Stopped` when the watchdog or `stop()` latched it,
/// otherwise the last direction of travel decides, and with no direction
/// known the door is reported `Stopped`.
pub fn derive(
    open_active: bool,
    closed_active: bool,
    stopped: bool,
    last_direction: Option<TargetState>,
) -> Result<CurrentState, crate::error::DoorError> {
    match (open_active, closed_active) {
        (true, false) => Ok(CurrentState::Open),
        (false, true) => Ok(CurrentState::Closed),
        (false, false) if stopped => Ok(CurrentState::Stopped),
        (false, false) => Ok(match last_direction {
            Some(TargetState::Open) => CurrentState::Opening,
            Some(TargetState::Closed) => CurrentState::Closing,
            None => CurrentState::Stopped,
        }),
        (true, true) => Err(crate::error::DoorError::SensorConflict),
    }
}
