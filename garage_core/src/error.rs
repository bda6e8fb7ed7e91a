use thiserror::Error;

use crate::state::DoorEnd;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DoorError {
    /// Both end switches report active at once; no door position fits that.
    #[error("invalid state: open and closed sensors are both active")]
    SensorConflict,
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("{0} sensor is virtual and has no input to confirm")]
    NotWired(DoorEnd),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing relay")]
    MissingRelay,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Construction returns `eyre` reports; door operations name `DoorError`.
pub type Result<T, E = eyre::Report> = core::result::Result<T, E>;
pub use eyre::Report;
