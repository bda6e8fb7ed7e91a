//! Maps `Box<dyn Error>` from trait boundaries to typed `DoorError`.
//!
//! The traits in `garage_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to the engine's error enum, downcasting
//! `garage_hardware::HwError` when the `hardware-errors` feature is on.

use crate::error::DoorError;

/// Map a trait-boundary error to a typed `DoorError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> DoorError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<garage_hardware::HwError>() {
            return match hw {
                garage_hardware::HwError::Io(_) => DoorError::Hardware(hw.to_string()),
                other => DoorError::HardwareFault(other.to_string()),
            };
        }
    }

    DoorError::Hardware(e.to_string())
}

/// Shorthand for `map_err` on trait-boundary results.
pub(crate) fn hw<T>(r: Result<T, Box<dyn std::error::Error + Send + Sync>>) -> Result<T, DoorError> {
    r.map_err(|e| map_hw_error(e.as_ref()))
}
