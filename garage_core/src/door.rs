//! The door state machine.
//!
//! `Door` owns both end sensors, the pulse controller and the failure
//! watchdog. It is sans-IO: commands and raw sensor edges are fed in by the
//! host, and the host calls [`Door::poll`] whenever [`Door::next_deadline`]
//! passes. All timers are dispatched in deadline order with the deadline as
//! the logical time, so a late poll replays exactly what an on-time one
//! would have done.

use std::time::Instant;

use garage_traits::clock::{Clock, MonotonicClock};
use garage_traits::{DigitalInput, Relay};
use tracing::{debug, info, warn};

use crate::config::DoorConfig;
use crate::error::{BuildError, DoorError, Result};
use crate::events::{DoorEvent, Signals};
use crate::pulse::PulseController;
use crate::sensor::{ConfirmingSensor, Edge, Sensor, SensorSignal, TimedSensor};
use crate::state::{self, CurrentState, DoorEnd, TargetState};
use crate::status::DoorStatus;
use crate::timer::OneShot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerSource {
    Pulse,
    Sensor(DoorEnd),
    FailureWatchdog,
}

pub struct Door {
    cfg: DoorConfig,
    open_sensor: Sensor,
    closed_sensor: Sensor,
    relay: PulseController,
    target: TargetState,
    stopped: bool,
    last_direction: Option<TargetState>,
    failure: OneShot,
    signals: Signals,
    clock: Box<dyn Clock>,
}

impl core::fmt::Debug for Door {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Door")
            .field("name", &self.cfg.name)
            .field("open_sensor", &self.open_sensor)
            .field("closed_sensor", &self.closed_sensor)
            .field("target", &self.target)
            .field("stopped", &self.stopped)
            .field("last_direction", &self.last_direction)
            .field("failure", &self.failure.due())
            .finish()
    }
}

impl Door {
    pub fn builder() -> DoorBuilder {
        DoorBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.cfg.name
    }

    pub fn config(&self) -> &DoorConfig {
        &self.cfg
    }

    /// Derived from the sensors plus the stopped flag and last direction.
    /// Both sensors active is a hard fault.
    pub fn current_state(&self) -> Result<CurrentState, DoorError> {
        state::derive(
            self.open_sensor.active(),
            self.closed_sensor.active(),
            self.stopped,
            self.last_direction,
        )
    }

    pub fn target_state(&self) -> TargetState {
        self.target
    }

    pub fn is_virtual(&self, end: DoorEnd) -> bool {
        self.sensor(end).is_virtual()
    }

    pub fn status(&self) -> Result<DoorStatus, DoorError> {
        Ok(DoorStatus {
            current: self.current_state()?,
            target: self.target,
            stopped: self.stopped,
            last_direction: self.last_direction,
            open_active: self.open_sensor.active(),
            closed_active: self.closed_sensor.active(),
            relay_busy: self.relay.is_busy(),
            watchdog_armed: self.failure.is_armed(),
        })
    }

    pub fn subscribe(&mut self, f: impl FnMut(DoorEvent) + 'static) {
        self.signals.subscribe(f);
    }

    pub fn on(&mut self, kind: DoorEvent, f: impl FnMut() + 'static) {
        self.signals.on(kind, f);
    }

    pub fn open(&mut self) -> Result<(), DoorError> {
        let now = self.catch_up()?;
        info!(door = %self.cfg.name, "open requested");
        self.signals.emit(DoorEvent::Open);
        self.initiate(TargetState::Open, now)
    }

    pub fn close(&mut self) -> Result<(), DoorError> {
        let now = self.catch_up()?;
        info!(door = %self.cfg.name, "close requested");
        self.signals.emit(DoorEvent::Close);
        self.initiate(TargetState::Closed, now)
    }

    /// `open()` or `close()` by target, as an accessory bridge would ask.
    pub fn set_target(&mut self, target: TargetState) -> Result<(), DoorError> {
        match target {
            TargetState::Open => self.open(),
            TargetState::Closed => self.close(),
        }
    }

    /// Halt the door. Does nothing on doors that cannot be stopped.
    pub fn stop(&mut self) -> Result<(), DoorError> {
        let now = self.catch_up()?;
        if !self.cfg.can_be_stopped {
            debug!(door = %self.cfg.name, "stop ignored: door cannot be stopped");
            return Ok(());
        }
        if self.current_state()?.is_moving() {
            self.relay.activate(1, now)?;
            self.stopped = true;
            self.failure.cancel();
        }
        self.clear_virtual_triggers();
        info!(door = %self.cfg.name, "stopped");
        self.signals.emit(DoorEvent::Stopped);
        Ok(())
    }

    /// A wired sensor's input changed; the edge is confirmed later by `poll`.
    pub fn raw_edge(&mut self, end: DoorEnd) -> Result<(), DoorError> {
        let now = self.catch_up()?;
        match self.sensor_mut(end) {
            Sensor::Wired(s) => s.raw_edge(now),
            Sensor::Virtual(_) => Err(DoorError::NotWired(end)),
        }
    }

    /// Earliest pending timer across pulses, sensors and the watchdog.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_due().map(|(_, at)| at)
    }

    /// Run every timer that is due by the clock's current time.
    pub fn poll(&mut self) -> Result<(), DoorError> {
        let now = self.clock.now();
        self.poll_at(now)
    }

    /// Cancel all timers and leave the relay off.
    pub fn shutdown(&mut self) -> Result<(), DoorError> {
        info!(door = %self.cfg.name, "shutting down");
        self.failure.cancel();
        self.clear_virtual_triggers();
        self.relay.shutdown()
    }

    fn catch_up(&mut self) -> Result<Instant, DoorError> {
        let now = self.clock.now();
        self.poll_at(now)?;
        Ok(now)
    }

    fn poll_at(&mut self, now: Instant) -> Result<(), DoorError> {
        while let Some((source, at)) = self.next_due() {
            if at > now {
                break;
            }
            self.dispatch(source, at)?;
        }
        Ok(())
    }

    fn next_due(&self) -> Option<(TimerSource, Instant)> {
        [
            (TimerSource::Pulse, self.relay.deadline()),
            (TimerSource::Sensor(DoorEnd::Open), self.open_sensor.deadline()),
            (TimerSource::Sensor(DoorEnd::Closed), self.closed_sensor.deadline()),
            (TimerSource::FailureWatchdog, self.failure.due()),
        ]
        .into_iter()
        .filter_map(|(src, due)| due.map(|at| (src, at)))
        .min_by_key(|&(_, at)| at)
    }

    fn dispatch(&mut self, source: TimerSource, at: Instant) -> Result<(), DoorError> {
        match source {
            TimerSource::Pulse => self.relay.poll(at),
            TimerSource::Sensor(end) if self.virtual_arrival_contradicted(end) => {
                warn!(
                    door = %self.cfg.name,
                    sensor = %end,
                    "virtual arrival dropped: door still at the other end"
                );
                if let Some(v) = self.sensor_mut(end).as_virtual_mut() {
                    v.clear_time_trigger();
                }
                Ok(())
            }
            TimerSource::Sensor(end) => match self.sensor_mut(end).poll(at)? {
                Some(SensorSignal::Edge(edge)) => self.on_edge(end, edge, at),
                Some(SensorSignal::Noise) => {
                    self.signals.emit(DoorEvent::SensorNoise(end));
                    Ok(())
                }
                None => Ok(()),
            },
            TimerSource::FailureWatchdog => {
                if self.failure.take_expired(at).is_some() {
                    self.on_failure_timeout();
                }
                Ok(())
            }
        }
    }

    fn initiate(&mut self, to: TargetState, now: Instant) -> Result<(), DoorError> {
        let from = to.opposite();
        let current = self.current_state()?;
        if current == CurrentState::from(to) || current == to.via() {
            debug!(door = %self.cfg.name, %current, "already there or on the way");
            return Ok(());
        }

        let pulses = if current == CurrentState::from(from) {
            1
        } else if current == CurrentState::Stopped {
            match self.last_direction {
                Some(dir) if dir == from => {
                    if !self.cfg.can_be_stopped {
                        info!(door = %self.cfg.name, "stopped, cannot reverse");
                        self.signals.emit(DoorEvent::Stopped);
                        return Ok(());
                    }
                    2
                }
                _ => 1,
            }
        } else if self.cfg.can_be_stopped {
            2
        } else {
            info!(door = %self.cfg.name, %current, "door cannot be stopped; command ignored");
            return Ok(());
        };

        debug!(door = %self.cfg.name, pulses, %current, target = %to, "pulsing relay");
        self.relay.activate(pulses, now)?;
        self.begin_transition(to, now)
    }

    fn begin_transition(&mut self, to: TargetState, now: Instant) -> Result<(), DoorError> {
        self.stopped = false;
        self.last_direction = Some(to);
        self.target = to;
        self.failure.arm(now + self.cfg.failure_timeout());
        info!(door = %self.cfg.name, state = %to.via(), "transitioning");
        self.signals.emit(to.moving_event());
        self.follow_with_virtual_sensors(to, now)
    }

    /// Virtual sensors assume the door reaches `to` after the nominal travel
    /// time and that it left the other end immediately.
    fn follow_with_virtual_sensors(&mut self, to: TargetState, now: Instant) -> Result<(), DoorError> {
        if let Some(v) = self.sensor_mut(to.end()).as_virtual_mut() {
            v.delayed_trigger(true, now);
        }
        let left = to.end().opposite();
        let edge = self
            .sensor_mut(left)
            .as_virtual_mut()
            .and_then(|v| v.trigger(false));
        match edge {
            Some(edge) => self.on_edge(left, edge, now),
            None => Ok(()),
        }
    }

    fn on_edge(&mut self, end: DoorEnd, edge: Edge, now: Instant) -> Result<(), DoorError> {
        match edge {
            Edge::Activated => {
                self.target_reached(end.position());
                Ok(())
            }
            Edge::Deactivated => self.transitioning(end.opposite().position(), now),
        }
    }

    /// The sensor at the far end from `to` went inactive.
    fn transitioning(&mut self, to: TargetState, now: Instant) -> Result<(), DoorError> {
        let left = to.end().opposite();
        if self.sensor(left).active() {
            debug!(door = %self.cfg.name, sensor = %left, "stale deactivation ignored");
            return Ok(());
        }
        if self.current_state()? == to.via() && self.target == to {
            debug!(door = %self.cfg.name, state = %to.via(), "already transitioning");
            return Ok(());
        }
        self.begin_transition(to, now)
    }

    fn target_reached(&mut self, at: TargetState) {
        let end = at.end();
        if !self.sensor(end).active() {
            debug!(door = %self.cfg.name, sensor = %end, "stale activation ignored");
            return;
        }
        self.failure.cancel();
        self.last_direction = None;
        self.stopped = false;
        if let Some(v) = self.sensor_mut(end.opposite()).as_virtual_mut() {
            v.clear_time_trigger();
            // The door is confirmed at `end`, so it is not at the other one.
            v.trigger(false);
        }
        if self.target != at {
            warn!(
                door = %self.cfg.name,
                target = %self.target,
                reached = %at,
                "door reached the opposite end from its target"
            );
            self.target = at;
        }
        info!(door = %self.cfg.name, state = %at, "target reached");
        self.signals.emit(at.reached_event());
    }

    fn on_failure_timeout(&mut self) {
        warn!(
            door = %self.cfg.name,
            timeout_s = self.cfg.failure_timeout().as_secs(),
            "no end-of-travel signal in time; door considered stopped"
        );
        let at_end = [DoorEnd::Open, DoorEnd::Closed]
            .into_iter()
            .find(|&end| self.sensor(end).active());
        match at_end {
            // Never left: the door is still at a terminal state.
            Some(end) => {
                self.last_direction = None;
                self.target = end.position();
            }
            None => self.stopped = true,
        }
        self.clear_virtual_triggers();
        self.signals.emit(DoorEvent::Stopped);
    }

    /// A virtual sensor is about to report arrival while the sensor at the
    /// other end still reads active.
    fn virtual_arrival_contradicted(&self, end: DoorEnd) -> bool {
        let arriving = match self.sensor(end) {
            Sensor::Virtual(v) => v.pending_value() == Some(true),
            Sensor::Wired(_) => false,
        };
        arriving && self.sensor(end.opposite()).active()
    }

    fn clear_virtual_triggers(&mut self) {
        for s in [&mut self.open_sensor, &mut self.closed_sensor] {
            if let Some(v) = s.as_virtual_mut() {
                v.clear_time_trigger();
            }
        }
    }

    fn sensor(&self, end: DoorEnd) -> &Sensor {
        match end {
            DoorEnd::Open => &self.open_sensor,
            DoorEnd::Closed => &self.closed_sensor,
        }
    }

    fn sensor_mut(&mut self, end: DoorEnd) -> &mut Sensor {
        match end {
            DoorEnd::Open => &mut self.open_sensor,
            DoorEnd::Closed => &mut self.closed_sensor,
        }
    }
}

/// Builder for `Door`. Only the relay is required; a missing sensor is
/// replaced by a timed virtual one.
#[derive(Default)]
pub struct DoorBuilder {
    config: Option<DoorConfig>,
    relay: Option<Box<dyn Relay>>,
    open_sensor: Option<Box<dyn DigitalInput>>,
    closed_sensor: Option<Box<dyn DigitalInput>>,
    clock: Option<Box<dyn Clock>>,
}

impl DoorBuilder {
    pub fn with_config(mut self, cfg: DoorConfig) -> Self {
        self.config = Some(cfg);
        self
    }

    pub fn with_relay(mut self, relay: impl Relay + 'static) -> Self {
        self.relay = Some(Box::new(relay));
        self
    }

    pub fn with_open_sensor(mut self, input: impl DigitalInput + 'static) -> Self {
        self.open_sensor = Some(Box::new(input));
        self
    }

    pub fn with_closed_sensor(mut self, input: impl DigitalInput + 'static) -> Self {
        self.closed_sensor = Some(Box::new(input));
        self
    }

    /// Inject a clock (tests use `TestClock`). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn build(self) -> Result<Door> {
        let cfg = self.config.unwrap_or_default();
        if cfg.name.trim().is_empty() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "name must not be empty",
            )));
        }
        if cfg.max_transition_time.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_transition_time must be > 0",
            )));
        }
        if cfg.cycle.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "cycle must be > 0",
            )));
        }
        if cfg.confirm_delay.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "confirm_delay must be > 0",
            )));
        }
        let relay = self
            .relay
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRelay))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(MonotonicClock::new()) as Box<dyn Clock>);

        let open_wired = self
            .open_sensor
            .map(|i| ConfirmingSensor::new("open", i, cfg.confirm_delay))
            .transpose()?;
        let closed_wired = self
            .closed_sensor
            .map(|i| ConfirmingSensor::new("closed", i, cfg.confirm_delay))
            .transpose()?;

        let closed_sensor = match closed_wired {
            Some(s) => Sensor::Wired(s),
            None => {
                let initial = match &open_wired {
                    Some(open) => !open.active(),
                    None => cfg.initial_fallback_state == TargetState::Closed,
                };
                Sensor::Virtual(TimedSensor::new(
                    "closed (virtual)",
                    initial,
                    cfg.max_transition_time,
                ))
            }
        };
        let open_sensor = match open_wired {
            Some(s) => Sensor::Wired(s),
            None => Sensor::Virtual(TimedSensor::new(
                "open (virtual)",
                !closed_sensor.active(),
                cfg.max_transition_time,
            )),
        };

        let initial = state::derive(open_sensor.active(), closed_sensor.active(), false, None)?;
        let target = match initial {
            CurrentState::Open | CurrentState::Opening => TargetState::Open,
            CurrentState::Closed | CurrentState::Closing => TargetState::Closed,
            CurrentState::Stopped => cfg.initial_fallback_state,
        };
        let relay = PulseController::new(relay, cfg.cycle)?;

        info!(
            door = %cfg.name,
            state = %initial,
            target = %target,
            open_virtual = open_sensor.is_virtual(),
            closed_virtual = closed_sensor.is_virtual(),
            "door ready"
        );

        Ok(Door {
            cfg,
            open_sensor,
            closed_sensor,
            relay,
            target,
            stopped: false,
            last_direction: None,
            failure: OneShot::new(),
            signals: Signals::default(),
            clock,
        })
    }
}
