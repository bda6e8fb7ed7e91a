use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use garage_core::{CurrentState, Door, DoorConfig, DoorEnd, DoorEvent};
use garage_hardware::{SimInput, SimRelay};
use garage_traits::clock::TestClock;

struct Bench {
    door: Door,
    clock: TestClock,
    closed: SimInput,
    events: Rc<RefCell<Vec<DoorEvent>>>,
}

fn closed_door(confirm: Duration) -> Bench {
    let clock = TestClock::new();
    let closed = SimInput::new(true);
    let mut door = Door::builder()
        .with_config(DoorConfig {
            confirm_delay: confirm,
            ..DoorConfig::default()
        })
        .with_relay(SimRelay::new())
        .with_open_sensor(SimInput::new(false))
        .with_closed_sensor(closed.clone())
        .with_clock(clock.clone())
        .build()
        .expect("door build");
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    door.subscribe(move |e| sink.borrow_mut().push(e));
    Bench {
        door,
        clock,
        closed,
        events,
    }
}

#[test]
fn glitch_reverting_before_confirmation_is_noise() {
    let mut b = closed_door(Duration::from_millis(100));
    b.closed.set(false);
    b.door.raw_edge(DoorEnd::Closed).unwrap();
    b.clock.advance_ms(40);
    b.closed.set(true);
    b.clock.advance_ms(60);
    b.door.poll().unwrap();

    assert_eq!(b.door.current_state(), Ok(CurrentState::Closed));
    assert_eq!(*b.events.borrow(), vec![DoorEvent::SensorNoise(DoorEnd::Closed)]);
    assert!(!b.door.status().unwrap().watchdog_armed);
}

#[test]
fn bounce_settling_on_new_level_confirms_last_edge() {
    let mut b = closed_door(Duration::from_millis(100));
    for (ms, level) in [(0, false), (20, true), (20, false)] {
        b.clock.advance_ms(ms);
        b.closed.set(level);
        b.door.raw_edge(DoorEnd::Closed).unwrap();
    }
    // 100 ms after the first edge: still waiting on the last one.
    b.clock.advance_ms(60);
    b.door.poll().unwrap();
    assert_eq!(b.door.current_state(), Ok(CurrentState::Closed));

    b.clock.advance_ms(40);
    b.door.poll().unwrap();
    assert_eq!(b.door.current_state(), Ok(CurrentState::Opening));
    assert_eq!(*b.events.borrow(), vec![DoorEvent::Opening]);
}

#[test]
fn bounce_back_to_same_level_is_silent() {
    let mut b = closed_door(Duration::from_millis(100));
    b.closed.set(false);
    b.door.raw_edge(DoorEnd::Closed).unwrap();
    b.clock.advance_ms(30);
    b.closed.set(true);
    b.door.raw_edge(DoorEnd::Closed).unwrap();
    b.clock.advance_ms(200);
    b.door.poll().unwrap();

    assert_eq!(b.door.current_state(), Ok(CurrentState::Closed));
    assert!(b.events.borrow().is_empty());
}

#[test]
fn confirmation_delay_is_configurable() {
    let mut b = closed_door(Duration::from_millis(250));
    b.closed.set(false);
    b.door.raw_edge(DoorEnd::Closed).unwrap();
    b.clock.advance_ms(249);
    b.door.poll().unwrap();
    assert_eq!(b.door.current_state(), Ok(CurrentState::Closed));
    b.clock.advance_ms(1);
    b.door.poll().unwrap();
    assert_eq!(b.door.current_state(), Ok(CurrentState::Opening));
}
