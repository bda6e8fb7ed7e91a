//! Door assembly: config mapping and hardware or simulated devices.

use crossbeam_channel::Sender;
use garage_config::{Config, InitialState};
use garage_core::{Door, DoorConfig, DoorEnd};
use garage_hardware::SimInput;

use crate::serve::Msg;

/// True when built without GPIO support.
pub const SIMULATION: bool = cfg!(not(all(feature = "hardware", target_os = "linux")));

/// Handles on simulated sensors so the host can flip them.
#[derive(Debug, Default)]
pub struct SimHandles {
    pub open: Option<SimInput>,
    pub closed: Option<SimInput>,
}

impl SimHandles {
    pub fn get(&self, end: DoorEnd) -> Option<&SimInput> {
        match end {
            DoorEnd::Open => self.open.as_ref(),
            DoorEnd::Closed => self.closed.as_ref(),
        }
    }
}

/// Build the door from config. With the `hardware` feature, sensor
/// interrupts are forwarded to `inbox` as `Msg::Edge`.
pub fn build_door(cfg: &Config, inbox: Option<Sender<Msg>>) -> eyre::Result<(Door, SimHandles)> {
    let door_cfg = DoorConfig::from(cfg);

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        use eyre::WrapErr;
        use garage_hardware::{GpioInput, GpioRelay};

        let relay = GpioRelay::new(cfg.relay.pin, cfg.relay.active_high)
            .wrap_err("open relay pin")?;
        let mut builder = Door::builder().with_config(door_cfg).with_relay(relay);
        for (end, sensor) in [
            (DoorEnd::Open, cfg.open_sensor),
            (DoorEnd::Closed, cfg.closed_sensor),
        ] {
            let Some(s) = sensor else { continue };
            let mut input = GpioInput::new(s.pin, s.active_high).wrap_err("open sensor pin")?;
            if let Some(tx) = inbox.clone() {
                input
                    .watch(move |_level| {
                        let _ = tx.send(Msg::Edge(end));
                    })
                    .wrap_err("watch sensor pin")?;
            }
            tracing::info!(%end, pin = s.pin, active_high = s.active_high, "sensor wired");
            builder = match end {
                DoorEnd::Open => builder.with_open_sensor(input),
                DoorEnd::Closed => builder.with_closed_sensor(input),
            };
        }
        let door = builder.build()?;
        Ok((door, SimHandles::default()))
    }

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let _ = inbox;
        build_sim(cfg, door_cfg)
    }
}

/// Simulated devices. A configured sensor becomes a `SimInput` seeded from
/// the fallback state; an unconfigured one stays virtual.
#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
fn build_sim(cfg: &Config, door_cfg: DoorConfig) -> eyre::Result<(Door, SimHandles)> {
    use garage_hardware::SimRelay;

    let open_seed = cfg.initial_fallback_state == InitialState::Open;
    let mut handles = SimHandles::default();
    let mut builder = Door::builder()
        .with_config(door_cfg)
        .with_relay(SimRelay::new());
    if cfg.open_sensor.is_some() {
        let input = SimInput::new(open_seed);
        handles.open = Some(input.clone());
        builder = builder.with_open_sensor(input);
    }
    if cfg.closed_sensor.is_some() {
        let input = SimInput::new(!open_seed);
        handles.closed = Some(input.clone());
        builder = builder.with_closed_sensor(input);
    }
    tracing::info!(wired = cfg.wired_sensors(), "simulation backend");
    let door = builder.build()?;
    Ok((door, handles))
}
