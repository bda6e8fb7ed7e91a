//! End-of-travel sensors.
//!
//! Two variants share the same contract (a point-in-time `active` reading and
//! deduplicated activation/deactivation edges):
//!
//! - [`ConfirmingSensor`]: a wired switch. A raw interrupt is not trusted; the
//!   input is re-read after a confirmation delay and the edge is reported only
//!   if both reads agree.
//! - [`TimedSensor`]: stands in for an end with no switch, assuming the door
//!   gets there after the nominal travel time.

use std::time::{Duration, Instant};

use garage_traits::DigitalInput;
use tracing::{debug, trace, warn};

use crate::error::DoorError;
use crate::hw_error::hw;
use crate::timer::OneShot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Activated,
    Deactivated,
}

impl Edge {
    fn to(active: bool) -> Self {
        if active {
            Edge::Activated
        } else {
            Edge::Deactivated
        }
    }
}

/// Outcome of a due sensor timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSignal {
    Edge(Edge),
    /// Confirmation read contradicted the interrupt reading.
    Noise,
}

pub struct ConfirmingSensor<I> {
    name: String,
    input: I,
    confirmed: bool,
    expected: bool,
    confirm: OneShot,
    confirm_delay: Duration,
}

impl<I> core::fmt::Debug for ConfirmingSensor<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfirmingSensor")
            .field("name", &self.name)
            .field("confirmed", &self.confirmed)
            .field("pending", &self.confirm.due())
            .finish()
    }
}

impl<I: DigitalInput> ConfirmingSensor<I> {
    /// Takes the current reading as the initial confirmed level.
    pub fn new(name: impl Into<String>, input: I, confirm_delay: Duration) -> Result<Self, DoorError> {
        let confirmed = hw(input.is_active())?;
        Ok(Self {
            name: name.into(),
            input,
            confirmed,
            expected: confirmed,
            confirm: OneShot::new(),
            confirm_delay,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last confirmed level.
    pub fn active(&self) -> bool {
        self.confirmed
    }

    /// The input changed. Only the most recent edge gets confirmed: a pending
    /// confirmation is replaced.
    pub fn raw_edge(&mut self, now: Instant) -> Result<(), DoorError> {
        self.expected = hw(self.input.is_active())?;
        self.confirm.arm(now + self.confirm_delay);
        trace!(sensor = %self.name, expected = self.expected, "edge pending confirmation");
        Ok(())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.confirm.due()
    }

    pub fn poll(&mut self, now: Instant) -> Result<Option<SensorSignal>, DoorError> {
        if self.confirm.take_expired(now).is_none() {
            return Ok(None);
        }
        let level = hw(self.input.is_active())?;
        if level != self.expected {
            warn!(
                sensor = %self.name,
                first = self.expected,
                reread = level,
                "re-read of sensor differed from first read"
            );
            return Ok(Some(SensorSignal::Noise));
        }
        if level == self.confirmed {
            trace!(sensor = %self.name, level, "edge confirmed but level unchanged");
            return Ok(None);
        }
        self.confirmed = level;
        debug!(sensor = %self.name, active = level, "sensor edge confirmed");
        Ok(Some(SensorSignal::Edge(Edge::to(level))))
    }
}

#[derive(Debug)]
pub struct TimedSensor {
    name: String,
    state: bool,
    delay: Duration,
    pending: OneShot,
    pending_value: bool,
}

impl TimedSensor {
    pub fn new(name: impl Into<String>, initial: bool, delay: Duration) -> Self {
        Self {
            name: name.into(),
            state: initial,
            delay,
            pending: OneShot::new(),
            pending_value: initial,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn active(&self) -> bool {
        self.state
    }

    /// Report `value` once the nominal travel time has elapsed.
    pub fn delayed_trigger(&mut self, value: bool, now: Instant) {
        self.clear_time_trigger();
        debug!(sensor = %self.name, value, delay_ms = self.delay.as_millis() as u64, "virtual trigger armed");
        self.pending_value = value;
        self.pending.arm(now + self.delay);
    }

    /// Cancel a pending delayed trigger; returns whether one was pending.
    pub fn clear_time_trigger(&mut self) -> bool {
        let cleared = self.pending.cancel();
        if cleared {
            debug!(sensor = %self.name, "virtual trigger cleared");
        }
        cleared
    }

    /// Set the level now. No edge when the level does not change.
    pub fn trigger(&mut self, value: bool) -> Option<Edge> {
        self.clear_time_trigger();
        if self.state == value {
            return None;
        }
        trace!(sensor = %self.name, value, "virtual sensor triggered");
        self.state = value;
        Some(Edge::to(value))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.due()
    }

    /// Level a pending delayed trigger will report, if one is armed.
    pub fn pending_value(&self) -> Option<bool> {
        self.pending.is_armed().then_some(self.pending_value)
    }

    pub fn poll(&mut self, now: Instant) -> Option<Edge> {
        self.pending.take_expired(now)?;
        debug!(sensor = %self.name, "virtual trigger time reached");
        self.trigger(self.pending_value)
    }
}

/// Sensor at one door end, chosen once at construction.
pub enum Sensor {
    Wired(ConfirmingSensor<Box<dyn DigitalInput>>),
    Virtual(TimedSensor),
}

impl core::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Sensor::Wired(s) => s.fmt(f),
            Sensor::Virtual(s) => s.fmt(f),
        }
    }
}

impl Sensor {
    pub fn name(&self) -> &str {
        match self {
            Sensor::Wired(s) => s.name(),
            Sensor::Virtual(s) => s.name(),
        }
    }

    pub fn active(&self) -> bool {
        match self {
            Sensor::Wired(s) => s.active(),
            Sensor::Virtual(s) => s.active(),
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Sensor::Virtual(_))
    }

    pub fn as_virtual_mut(&mut self) -> Option<&mut TimedSensor> {
        match self {
            Sensor::Virtual(s) => Some(s),
            Sensor::Wired(_) => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Sensor::Wired(s) => s.deadline(),
            Sensor::Virtual(s) => s.deadline(),
        }
    }

    pub fn poll(&mut self, now: Instant) -> Result<Option<SensorSignal>, DoorError> {
        match self {
            Sensor::Wired(s) => s.poll(now),
            Sensor::Virtual(s) => Ok(s.poll(now).map(SensorSignal::Edge)),
        }
    }
}
