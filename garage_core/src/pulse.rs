//! Timed relay pulse sequences.
//!
//! One pulse is the relay on for `cycle`, then off for `cycle`. The door
//! opener reads a single pulse as "start or resume" and two pulses as "halt,
//! then go the other way".

use std::time::{Duration, Instant};

use garage_traits::Relay;
use tracing::{debug, trace};

use crate::error::DoorError;
use crate::hw_error::hw;
use crate::timer::OneShot;

pub struct PulseController {
    relay: Box<dyn Relay>,
    cycle: Duration,
    /// Cycle of the running sequence (may differ from the default).
    active_cycle: Duration,
    /// Pulses still to be started.
    remaining: u32,
    on: bool,
    step: OneShot,
}

impl core::fmt::Debug for PulseController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PulseController")
            .field("cycle", &self.cycle)
            .field("remaining", &self.remaining)
            .field("on", &self.on)
            .field("next_step", &self.step.due())
            .finish()
    }
}

impl PulseController {
    /// Takes ownership of the relay and switches it off.
    pub fn new(mut relay: Box<dyn Relay>, cycle: Duration) -> Result<Self, DoorError> {
        hw(relay.turn_off())?;
        Ok(Self {
            relay,
            cycle,
            active_cycle: cycle,
            remaining: 0,
            on: false,
            step: OneShot::new(),
        })
    }

    pub fn cycle(&self) -> Duration {
        self.cycle
    }

    /// Whether a sequence is still running.
    pub fn is_busy(&self) -> bool {
        self.step.is_armed()
    }

    pub fn relay_on(&self) -> bool {
        self.relay.state()
    }

    pub fn activate(&mut self, count: u32, now: Instant) -> Result<(), DoorError> {
        self.activate_with_cycle(count, self.cycle, now)
    }

    /// Start `count` pulses of `cycle` each, replacing any sequence in progress.
    pub fn activate_with_cycle(
        &mut self,
        count: u32,
        cycle: Duration,
        now: Instant,
    ) -> Result<(), DoorError> {
        if count == 0 {
            return Ok(());
        }
        if self.step.cancel() {
            debug!(remaining = self.remaining, "pulse sequence replaced");
        }
        if self.on {
            self.off()?;
        }
        debug!(count, cycle_ms = cycle.as_millis() as u64, "relay pulse sequence");
        self.active_cycle = cycle;
        self.remaining = count;
        self.start_pulse(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.step.due()
    }

    /// Run the next step if it is due. Steps are scheduled from the instant
    /// the previous one was due, so a late poll does not stretch the sequence.
    pub fn poll(&mut self, now: Instant) -> Result<(), DoorError> {
        let Some(at) = self.step.take_expired(now) else {
            return Ok(());
        };
        if self.on {
            if let Err(e) = self.off() {
                // Retry the release one cycle later.
                self.step.arm(at + self.active_cycle);
                return Err(e);
            }
            if self.remaining > 0 {
                self.step.arm(at + self.active_cycle);
            }
            Ok(())
        } else {
            self.start_pulse(at)
        }
    }

    /// Abandon any sequence and leave the relay off.
    pub fn shutdown(&mut self) -> Result<(), DoorError> {
        self.step.cancel();
        self.remaining = 0;
        self.off()
    }

    fn start_pulse(&mut self, at: Instant) -> Result<(), DoorError> {
        hw(self.relay.turn_on())?;
        self.on = true;
        self.remaining -= 1;
        trace!(remaining = self.remaining, "relay on");
        self.step.arm(at + self.active_cycle);
        Ok(())
    }

    fn off(&mut self) -> Result<(), DoorError> {
        hw(self.relay.turn_off())?;
        self.on = false;
        trace!("relay off");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_hardware::SimRelay;

    const CYCLE: Duration = Duration::from_millis(600);

    fn drain(p: &mut PulseController) {
        while let Some(at) = p.deadline() {
            p.poll(at).unwrap();
        }
    }

    #[test]
    fn construction_turns_relay_off() {
        let relay = SimRelay::new();
        let probe = relay.clone();
        let _p = PulseController::new(Box::new(relay), CYCLE).unwrap();
        assert_eq!(probe.history(), vec![false]);
    }

    #[test]
    fn two_pulses_alternate_on_off() {
        let t0 = Instant::now();
        let relay = SimRelay::new();
        let probe = relay.clone();
        let mut p = PulseController::new(Box::new(relay), CYCLE).unwrap();

        p.activate(2, t0).unwrap();
        assert!(probe.state());
        assert_eq!(p.deadline(), Some(t0 + CYCLE));
        p.poll(t0 + CYCLE).unwrap();
        assert!(!probe.state());
        assert_eq!(p.deadline(), Some(t0 + 2 * CYCLE));
        drain(&mut p);

        assert_eq!(probe.pulses(), 2);
        assert!(!probe.state());
        assert!(!p.is_busy());
    }

    #[test]
    fn zero_is_a_no_op() {
        let relay = SimRelay::new();
        let probe = relay.clone();
        let mut p = PulseController::new(Box::new(relay), CYCLE).unwrap();
        p.activate(0, Instant::now()).unwrap();
        assert_eq!(probe.pulses(), 0);
        assert_eq!(p.deadline(), None);
    }

    #[test]
    fn new_activation_replaces_running_sequence() {
        let t0 = Instant::now();
        let relay = SimRelay::new();
        let probe = relay.clone();
        let mut p = PulseController::new(Box::new(relay), CYCLE).unwrap();

        p.activate(2, t0).unwrap();
        p.activate(1, t0 + Duration::from_millis(100)).unwrap();
        drain(&mut p);
        assert_eq!(probe.pulses(), 2);
        assert_eq!(probe.history(), vec![false, true, false, true, false]);
    }

    #[test]
    fn custom_cycle_is_used_for_the_sequence() {
        let t0 = Instant::now();
        let mut p = PulseController::new(Box::new(SimRelay::new()), CYCLE).unwrap();
        let short = Duration::from_millis(50);
        p.activate_with_cycle(1, short, t0).unwrap();
        assert_eq!(p.deadline(), Some(t0 + short));
        p.activate(1, t0).unwrap();
        assert_eq!(p.deadline(), Some(t0 + CYCLE));
    }

    #[test]
    fn relay_failure_is_reported() {
        let relay = SimRelay::new();
        let probe = relay.clone();
        let mut p = PulseController::new(Box::new(relay), CYCLE).unwrap();
        probe.set_failing(true);
        let err = p.activate(1, Instant::now()).unwrap_err();
        assert!(matches!(err, DoorError::HardwareFault(_)));
    }

    #[test]
    fn failed_release_is_retried_next_cycle() {
        let t0 = Instant::now();
        let relay = SimRelay::new();
        let probe = relay.clone();
        let mut p = PulseController::new(Box::new(relay), CYCLE).unwrap();
        p.activate(1, t0).unwrap();

        probe.set_failing(true);
        assert!(p.poll(t0 + CYCLE).is_err());
        assert!(probe.state());
        assert_eq!(p.deadline(), Some(t0 + 2 * CYCLE));

        probe.set_failing(false);
        p.poll(t0 + 2 * CYCLE).unwrap();
        assert!(!probe.state());
        assert!(!p.is_busy());
    }
}
