#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the garage door controller.
//!
//! - `Config` and its sections are deserialized from TOML with defaults for
//!   everything except the relay pin.
//! - A missing `[open_sensor]` / `[closed_sensor]` section means no switch is
//!   wired at that end; the engine substitutes a timed virtual sensor.
use serde::Deserialize;

/// Where the door is assumed to be when no sensor can tell.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InitialState {
    Open,
    #[default]
    Closed,
}

/// Relay that pulses the door opener's push-button input.
#[derive(Debug, Deserialize, Clone)]
pub struct RelayCfg {
    pub pin: u8,
    #[serde(default = "default_true")]
    pub active_high: bool,
    /// Length of one on (or off) half of a pulse, in milliseconds.
    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct SensorCfg {
    pub pin: u8,
    #[serde(default = "default_true")]
    pub active_high: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// Delay before a sensor edge is re-read and trusted.
    pub confirm_ms: u64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self { confirm_ms: 100 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    /// Whether a pulse while moving halts the door (enables stop and reverse).
    #[serde(default = "default_true")]
    pub can_be_stopped: bool,
    /// Nominal end-to-end travel time in seconds.
    #[serde(default = "default_max_transition_time_s")]
    pub max_transition_time_s: u64,
    #[serde(default)]
    pub initial_fallback_state: InitialState,
    pub relay: RelayCfg,
    #[serde(default)]
    pub open_sensor: Option<SensorCfg>,
    #[serde(default)]
    pub closed_sensor: Option<SensorCfg>,
    #[serde(default)]
    pub hardware: Hardware,
    #[serde(default)]
    pub logging: Logging,
}

fn default_true() -> bool {
    true
}

fn default_cycle_ms() -> u64 {
    600
}

fn default_max_transition_time_s() -> u64 {
    30
}

fn default_name() -> String {
    "Garage Door".to_string()
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration in {:?}: {}", path, e))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        if self.name.trim().is_empty() {
            eyre::bail!("name must not be empty");
        }

        // Timing
        if self.max_transition_time_s == 0 {
            eyre::bail!("max_transition_time_s must be >= 1");
        }
        if self.max_transition_time_s > 60 * 60 {
            eyre::bail!("max_transition_time_s is unreasonably large (>1h)");
        }
        if self.relay.cycle_ms == 0 {
            eyre::bail!("relay.cycle_ms must be >= 1");
        }
        if self.relay.cycle_ms > 10_000 {
            eyre::bail!("relay.cycle_ms is unreasonably large (>10s)");
        }
        if self.hardware.confirm_ms == 0 {
            eyre::bail!("hardware.confirm_ms must be >= 1");
        }
        if self.hardware.confirm_ms > 5_000 {
            eyre::bail!("hardware.confirm_ms is unreasonably large (>5s)");
        }

        // Pins
        for (label, sensor) in [
            ("open_sensor", self.open_sensor),
            ("closed_sensor", self.closed_sensor),
        ] {
            if let Some(s) = sensor
                && s.pin == self.relay.pin
            {
                eyre::bail!("{label}.pin must differ from relay.pin ({})", s.pin);
            }
        }
        if let (Some(open), Some(closed)) = (self.open_sensor, self.closed_sensor)
            && open.pin == closed.pin
        {
            eyre::bail!("open_sensor.pin and closed_sensor.pin must differ");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }

    /// Number of door ends backed by a physical switch.
    pub fn wired_sensors(&self) -> usize {
        usize::from(self.open_sensor.is_some()) + usize::from(self.closed_sensor.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_takes_defaults() {
        let cfg = load_toml("[relay]\npin = 17\n").expect("parse");
        assert_eq!(cfg.name, "Garage Door");
        assert!(cfg.can_be_stopped);
        assert_eq!(cfg.max_transition_time_s, 30);
        assert_eq!(cfg.initial_fallback_state, InitialState::Closed);
        assert!(cfg.relay.active_high);
        assert_eq!(cfg.relay.cycle_ms, 600);
        assert_eq!(cfg.hardware.confirm_ms, 100);
        assert_eq!(cfg.wired_sensors(), 0);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn relay_section_is_required() {
        assert!(load_toml("name = \"x\"\n").is_err());
    }
}
