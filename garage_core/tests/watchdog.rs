use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use garage_core::{CurrentState, Door, DoorConfig, DoorEnd, DoorEvent, TargetState};
use garage_hardware::{SimInput, SimRelay};
use garage_traits::Clock;
use garage_traits::clock::TestClock;

fn build(cfg: DoorConfig) -> (Door, TestClock, SimRelay, SimInput, Rc<RefCell<u32>>) {
    let clock = TestClock::new();
    let relay = SimRelay::new();
    let closed = SimInput::new(true);
    let mut door = Door::builder()
        .with_config(cfg)
        .with_relay(relay.clone())
        .with_open_sensor(SimInput::new(false))
        .with_closed_sensor(closed.clone())
        .with_clock(clock.clone())
        .build()
        .expect("door build");
    let stops = Rc::new(RefCell::new(0));
    let s = stops.clone();
    door.on(DoorEvent::Stopped, move || *s.borrow_mut() += 1);
    (door, clock, relay, closed, stops)
}

/// Command open and let the closed sensor release, but never confirm arrival.
fn start_opening(door: &mut Door, clock: &TestClock, closed: &SimInput) {
    door.open().unwrap();
    clock.advance_ms(1_000);
    closed.set(false);
    door.raw_edge(DoorEnd::Closed).unwrap();
    clock.advance_ms(100);
    door.poll().unwrap();
    assert_eq!(door.current_state(), Ok(CurrentState::Opening));
}

#[test]
fn fires_once_after_travel_time_plus_leniency() {
    let (mut door, clock, _relay, closed, stops) = build(DoorConfig::default());
    start_opening(&mut door, &clock, &closed);

    // Armed at t=0 for 30 s + 5 s; we are at 1.1 s.
    clock.advance(Duration::from_millis(33_899));
    door.poll().unwrap();
    assert_eq!(*stops.borrow(), 0);
    assert_eq!(door.current_state(), Ok(CurrentState::Opening));

    clock.advance_ms(1);
    door.poll().unwrap();
    assert_eq!(*stops.borrow(), 1);
    assert_eq!(door.current_state(), Ok(CurrentState::Stopped));
    assert!(door.status().unwrap().stopped);

    clock.advance(Duration::from_secs(120));
    door.poll().unwrap();
    assert_eq!(*stops.borrow(), 1);
    assert_eq!(door.next_deadline(), None);
}

#[test]
fn accepted_departure_rearms_watchdog() {
    let (mut door, clock, _relay, closed, stops) = build(DoorConfig::default());
    clock.advance_ms(10_000);
    closed.set(false);
    door.raw_edge(DoorEnd::Closed).unwrap();
    clock.advance_ms(100);
    door.poll().unwrap();

    let armed_at = clock.now();
    assert_eq!(door.next_deadline(), Some(armed_at + Duration::from_secs(35)));
    clock.advance(Duration::from_secs(35));
    door.poll().unwrap();
    assert_eq!(*stops.borrow(), 1);
}

#[test]
fn timeout_with_sensor_still_active_keeps_position() {
    let (mut door, clock, _relay, _closed, stops) = build(DoorConfig::default());
    // Door never leaves: the closed sensor stays active.
    door.open().unwrap();
    clock.advance(Duration::from_secs(40));
    door.poll().unwrap();

    assert_eq!(*stops.borrow(), 1);
    assert_eq!(door.current_state(), Ok(CurrentState::Closed));
    let status = door.status().unwrap();
    assert!(!status.stopped);
    assert_eq!(status.last_direction, None);
    assert_eq!(door.target_state(), TargetState::Closed);
}

#[test]
fn manual_departure_after_timeout_at_end_is_watched() {
    let (mut door, clock, _relay, closed, stops) = build(DoorConfig::default());
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    door.subscribe(move |e| sink.borrow_mut().push(e));

    door.open().unwrap();
    clock.advance(Duration::from_secs(36));
    door.poll().unwrap();
    assert_eq!(*stops.borrow(), 1);
    events.borrow_mut().clear();

    // Someone opens it by hand later on.
    clock.advance(Duration::from_secs(60));
    closed.set(false);
    door.raw_edge(DoorEnd::Closed).unwrap();
    clock.advance_ms(100);
    door.poll().unwrap();
    assert_eq!(*events.borrow(), vec![DoorEvent::Opening]);
    assert_eq!(door.current_state(), Ok(CurrentState::Opening));
    assert!(door.status().unwrap().watchdog_armed);

    // It jams halfway: the watchdog still catches it.
    clock.advance(Duration::from_secs(35));
    door.poll().unwrap();
    assert_eq!(*stops.borrow(), 2);
    assert_eq!(door.current_state(), Ok(CurrentState::Stopped));
}

#[test]
fn reversal_from_timed_out_door_needs_stoppable_opener() {
    let cfg = DoorConfig {
        can_be_stopped: false,
        ..DoorConfig::default()
    };
    let (mut door, clock, relay, closed, stops) = build(cfg);
    start_opening(&mut door, &clock, &closed);
    clock.advance(Duration::from_secs(40));
    door.poll().unwrap();
    assert_eq!(*stops.borrow(), 1);
    let before = relay.pulses();

    door.close().unwrap();
    assert_eq!(relay.pulses(), before);
    assert_eq!(*stops.borrow(), 2);
    assert_eq!(door.current_state(), Ok(CurrentState::Stopped));
    assert_eq!(door.target_state(), TargetState::Open);

    // Resuming in the same direction is still allowed.
    door.open().unwrap();
    assert_eq!(relay.pulses(), before + 1);
    assert_eq!(door.current_state(), Ok(CurrentState::Opening));
}

#[test]
fn shorter_travel_time_shortens_window() {
    let cfg = DoorConfig {
        max_transition_time: Duration::from_secs(10),
        ..DoorConfig::default()
    };
    let (mut door, clock, _relay, closed, stops) = build(cfg);
    start_opening(&mut door, &clock, &closed);
    clock.advance_ms(13_900);
    door.poll().unwrap();
    assert_eq!(*stops.borrow(), 1);
}
