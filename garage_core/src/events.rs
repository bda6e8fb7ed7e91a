//! Door notifications and their synchronous fan-out.

use core::fmt;

use crate::state::DoorEnd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorEvent {
    /// `open()` was called.
    Open,
    /// `close()` was called.
    Close,
    Opening,
    Closing,
    Opened,
    Closed,
    /// Halted mid-travel, timed out, or a reversal was refused.
    Stopped,
    /// A sensor edge did not survive its confirmation read.
    SensorNoise(DoorEnd),
}

impl fmt::Display for DoorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoorEvent::Open => f.write_str("Open"),
            DoorEvent::Close => f.write_str("Close"),
            DoorEvent::Opening => f.write_str("Opening"),
            DoorEvent::Closing => f.write_str("Closing"),
            DoorEvent::Opened => f.write_str("Opened"),
            DoorEvent::Closed => f.write_str("Closed"),
            DoorEvent::Stopped => f.write_str("Stopped"),
            DoorEvent::SensorNoise(end) => write!(f, "SensorNoise({end})"),
        }
    }
}

type Listener = Box<dyn FnMut(DoorEvent)>;

/// Observer list. Listeners run in subscription order, on the caller's
/// stack, before the door method that raised the event returns.
#[derive(Default)]
pub struct Signals {
    listeners: Vec<Listener>,
}

impl fmt::Debug for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signals")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Signals {
    pub fn subscribe(&mut self, f: impl FnMut(DoorEvent) + 'static) {
        self.listeners.push(Box::new(f));
    }

    /// Subscribe to a single kind of event.
    pub fn on(&mut self, kind: DoorEvent, mut f: impl FnMut() + 'static) {
        self.subscribe(move |e| {
            if e == kind {
                f();
            }
        });
    }

    pub fn emit(&mut self, event: DoorEvent) {
        tracing::trace!(%event, "emit");
        for l in self.listeners.iter_mut() {
            l(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn fan_out_preserves_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signals = Signals::default();
        let a = seen.clone();
        signals.subscribe(move |e| a.borrow_mut().push(("a", e)));
        let b = seen.clone();
        signals.subscribe(move |e| b.borrow_mut().push(("b", e)));

        signals.emit(DoorEvent::Opening);
        signals.emit(DoorEvent::Opened);

        assert_eq!(
            *seen.borrow(),
            vec![
                ("a", DoorEvent::Opening),
                ("b", DoorEvent::Opening),
                ("a", DoorEvent::Opened),
                ("b", DoorEvent::Opened),
            ]
        );
    }

    #[test]
    fn on_filters_by_kind() {
        let hits = Rc::new(RefCell::new(0));
        let mut signals = Signals::default();
        let h = hits.clone();
        signals.on(DoorEvent::Stopped, move || *h.borrow_mut() += 1);
        signals.emit(DoorEvent::Closing);
        signals.emit(DoorEvent::Stopped);
        signals.emit(DoorEvent::SensorNoise(DoorEnd::Open));
        assert_eq!(*hits.borrow(), 1);
    }
}
