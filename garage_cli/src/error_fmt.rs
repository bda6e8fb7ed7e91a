//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use garage_core::error::{BuildError, DoorError};

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRelay => {
                "What happened: No relay was provided to the door.\nLikely causes: The relay output failed to initialize or was not wired into the builder.\nHow to fix: Check [relay] in the config and that the relay pin can be opened.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/garage.toml for a sample."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DoorError>() {
        return match de {
            DoorError::SensorConflict => {
                "What happened: The open and closed sensors are both active.\nLikely causes: A sensor is wired with the wrong polarity, two sensors share a signal line, or a switch is stuck.\nHow to fix: Check active_high for both sensors and the wiring, then restart.".to_string()
            }
            DoorError::NotWired(end) => format!(
                "What happened: The {end} end has no wired sensor.\nLikely causes: [{end}_sensor] is missing from the config, so a timed virtual sensor is used.\nHow to fix: Add the sensor section or do not inject edges for that end."
            ),
            DoorError::Hardware(msg) | DoorError::HardwareFault(msg) => format!(
                "What happened: GPIO access failed ({msg}).\nLikely causes: Wrong pin numbers, missing permissions for /dev/gpiomem, or a pin already in use.\nHow to fix: Check the pins in the config and run with access to GPIO."
            ),
            DoorError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    // Alternate form includes the context chain ("outer: inner").
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass an existing TOML file with --config. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration")
        || lower.contains("must be")
        || lower.contains("must differ")
        || lower.contains("unreasonably large")
    {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Missing [relay] section, a duplicated pin, or out-of-range values.\nHow to fix: Edit the TOML config and try again. Details: {msg}"
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// A sensor conflict exits with 3, everything else with 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use garage_core::error::DoorError;
    match err.downcast_ref::<DoorError>() {
        Some(DoorError::SensorConflict) => 3,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    use garage_core::error::{BuildError, DoorError};
    if let Some(de) = err.downcast_ref::<DoorError>() {
        return match de {
            DoorError::SensorConflict => "SensorConflict",
            DoorError::Hardware(_) => "Hardware",
            DoorError::HardwareFault(_) => "HardwareFault",
            DoorError::NotWired(_) => "NotWired",
            DoorError::Config(_) => "Config",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
