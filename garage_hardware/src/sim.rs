use std::cell::{Cell, RefCell};
use std::rc::Rc;

use garage_traits::{DigitalInput, Relay};
use tracing::trace;

/// Simulated relay. Clones share state, so a handle kept outside the door
/// can inspect what the engine did.
#[derive(Debug, Clone, Default)]
pub struct SimRelay {
    on: Rc<Cell<bool>>,
    history: Rc<RefCell<Vec<bool>>>,
    fail: Rc<Cell<bool>>,
}

impl SimRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every level written, in order (`true` = on).
    pub fn history(&self) -> Vec<bool> {
        self.history.borrow().clone()
    }

    /// Number of off→on transitions seen so far.
    pub fn pulses(&self) -> usize {
        let h = self.history.borrow();
        let mut prev = false;
        let mut n = 0;
        for &level in h.iter() {
            if level && !prev {
                n += 1;
            }
            prev = level;
        }
        n
    }

    /// Make subsequent writes fail, to exercise error paths.
    pub fn set_failing(&self, fail: bool) {
        self.fail.set(fail);
    }

    fn write(&self, level: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail.get() {
            return Err(Box::new(crate::HwError::Gpio("simulated relay fault".into())));
        }
        trace!(level, "sim relay write");
        self.on.set(level);
        self.history.borrow_mut().push(level);
        Ok(())
    }
}

impl Relay for SimRelay {
    fn turn_on(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.write(true)
    }

    fn turn_off(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.write(false)
    }

    fn state(&self) -> bool {
        self.on.get()
    }
}

/// Simulated proximity sensor; flip it with [`SimInput::set`].
#[derive(Debug, Clone, Default)]
pub struct SimInput {
    level: Rc<Cell<bool>>,
}

impl SimInput {
    pub fn new(active: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(active)),
        }
    }

    pub fn set(&self, active: bool) {
        self.level.set(active);
    }

    pub fn get(&self) -> bool {
        self.level.get()
    }
}

impl DigitalInput for SimInput {
    fn is_active(&self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.level.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_counts_rising_edges() {
        let mut relay = SimRelay::new();
        let probe = relay.clone();
        relay.turn_on().unwrap();
        relay.turn_off().unwrap();
        relay.turn_off().unwrap();
        relay.turn_on().unwrap();
        relay.turn_on().unwrap();
        assert_eq!(probe.pulses(), 2);
        assert!(probe.state());
    }

    #[test]
    fn failing_relay_keeps_level() {
        let mut relay = SimRelay::new();
        relay.set_failing(true);
        assert!(relay.turn_on().is_err());
        assert!(!relay.state());
        assert!(relay.history().is_empty());
    }

    #[test]
    fn input_clones_share_level() {
        let input = SimInput::new(false);
        let handle = input.clone();
        handle.set(true);
        assert!(input.is_active().unwrap());
    }
}
