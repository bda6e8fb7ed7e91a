//! Single-threaded event loop around the door.
//!
//! Everything that can wake the door (stdin lines, GPIO interrupts, Ctrl-C)
//! arrives as a `Msg` on one channel. Between messages the loop sleeps until
//! the door's next deadline, then lets the door run its timers.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use garage_core::{Door, DoorEnd, DoorEvent};
use garage_traits::clock::{Clock, MonotonicClock};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::backend::{SIMULATION, SimHandles};
use crate::error_fmt::humanize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Line(String),
    /// Raw interrupt on a wired sensor.
    Edge(DoorEnd),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Open,
    Close,
    Stop,
    Status,
    /// Flip a simulated sensor and inject its edge.
    Sim(DoorEnd, bool),
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["open"] => Ok(Command::Open),
        ["close"] => Ok(Command::Close),
        ["stop"] => Ok(Command::Stop),
        ["status"] => Ok(Command::Status),
        ["quit"] | ["exit"] => Ok(Command::Quit),
        ["sim", end, level] => {
            let end = match *end {
                "open" => DoorEnd::Open,
                "closed" => DoorEnd::Closed,
                other => return Err(format!("unknown sensor {other:?}, expected open|closed")),
            };
            let active = match *level {
                "on" | "1" | "true" => true,
                "off" | "0" | "false" => false,
                other => return Err(format!("unknown level {other:?}, expected on|off")),
            };
            Ok(Command::Sim(end, active))
        }
        _ => Err(format!("unknown command {line:?}")),
    }
}

/// Print events on stdout as they are emitted.
pub fn print_events(door: &mut Door, json_mode: bool) {
    door.subscribe(move |event: DoorEvent| {
        if json_mode {
            println!("{}", json!({ "event": event.to_string() }));
        } else {
            println!("event: {event}");
        }
    });
}

fn print_status(door: &Door, json_mode: bool) -> eyre::Result<()> {
    let status = door.status()?;
    if json_mode {
        println!(
            "{}",
            json!({
                "current": status.current.to_string(),
                "target": status.target.to_string(),
                "stopped": status.stopped,
                "last_direction": status.last_direction.map(|d| d.to_string()),
                "open_active": status.open_active,
                "closed_active": status.closed_active,
                "relay_busy": status.relay_busy,
            })
        );
    } else {
        println!("{}", status.summary());
    }
    Ok(())
}

/// What the loop should do after a message.
enum Flow {
    Continue,
    Quit,
}

fn handle_line(door: &mut Door, sims: &SimHandles, line: &str, json_mode: bool) -> eyre::Result<Flow> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Flow::Continue);
    }
    let cmd = parse_command(line).map_err(|e| eyre::eyre!(e))?;
    debug!(?cmd, "command");
    match cmd {
        Command::Open => door.open()?,
        Command::Close => door.close()?,
        Command::Stop => door.stop()?,
        Command::Status => print_status(door, json_mode)?,
        Command::Sim(end, active) => {
            if !SIMULATION {
                eyre::bail!("sim commands are only available in simulation builds");
            }
            let input = sims
                .get(end)
                .ok_or_else(|| eyre::eyre!("no simulated sensor at the {end} end"))?;
            input.set(active);
            door.raw_edge(end)?;
        }
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Serve until `quit`, end of input, or a shutdown message. Command errors
/// are reported and the loop keeps going.
pub fn serve(door: &mut Door, sims: &SimHandles, rx: &Receiver<Msg>, json_mode: bool) -> eyre::Result<()> {
    let clock = MonotonicClock::new();
    info!(door = %door.name(), "serving");
    loop {
        let msg = match door.next_deadline() {
            Some(deadline) => match rx.recv_timeout(clock.until(deadline)) {
                Ok(m) => Some(m),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(m) => Some(m),
                Err(_) => break,
            },
        };

        if let Err(e) = door.poll() {
            let report = eyre::Report::new(e);
            warn!(error = %report, "timer processing failed");
            report_error(&report, json_mode);
        }

        let outcome = match msg {
            None => continue,
            Some(Msg::Shutdown) => {
                info!("shutdown requested");
                break;
            }
            Some(Msg::Edge(end)) => door.raw_edge(end).map(|()| Flow::Continue).map_err(eyre::Report::from),
            Some(Msg::Line(line)) => handle_line(door, sims, &line, json_mode),
        };
        match outcome {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => {
                warn!(error = %e, "command failed");
                report_error(&e, json_mode);
            }
        }
    }
    door.shutdown()?;
    Ok(())
}

fn report_error(err: &eyre::Report, json_mode: bool) {
    if json_mode {
        println!("{}", crate::error_fmt::format_error_json(err));
    } else {
        println!("error: {}", humanize(err));
    }
}
