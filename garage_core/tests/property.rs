use garage_core::{CurrentState, Door, DoorConfig, DoorEnd, DoorError};
use garage_hardware::{Relay, SimInput, SimRelay};
use garage_traits::clock::TestClock;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Sensor(DoorEnd, bool),
    Open,
    Close,
    Stop,
    Wait(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<bool>(), any::<bool>()).prop_map(|(open_end, level)| {
            let end = if open_end { DoorEnd::Open } else { DoorEnd::Closed };
            Op::Sensor(end, level)
        }),
        Just(Op::Open),
        Just(Op::Close),
        Just(Op::Stop),
        (0u64..40_000).prop_map(Op::Wait),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn derived_state_matches_settled_sensors(
        start_open in any::<bool>(),
        can_be_stopped in any::<bool>(),
        ops in proptest::collection::vec(op(), 1..40),
    ) {
        let clock = TestClock::new();
        let relay = SimRelay::new();
        let open = SimInput::new(start_open);
        let closed = SimInput::new(!start_open);
        let mut door = Door::builder()
            .with_config(DoorConfig { can_be_stopped, ..DoorConfig::default() })
            .with_relay(relay.clone())
            .with_open_sensor(open.clone())
            .with_closed_sensor(closed.clone())
            .with_clock(clock.clone())
            .build()
            .expect("door build");

        for op in ops {
            // Commands fail while both sensors are active; that is expected.
            let _ = match op {
                Op::Sensor(end, level) => {
                    match end {
                        DoorEnd::Open => open.set(level),
                        DoorEnd::Closed => closed.set(level),
                    }
                    door.raw_edge(end)
                }
                Op::Open => door.open(),
                Op::Close => door.close(),
                Op::Stop => door.stop(),
                Op::Wait(ms) => {
                    clock.advance_ms(ms);
                    door.poll()
                }
            };
            // Let confirmations settle.
            clock.advance_ms(200);
            door.poll().expect("poll");

            match (open.get(), closed.get()) {
                (true, true) => prop_assert_eq!(door.current_state(), Err(DoorError::SensorConflict)),
                (true, false) => prop_assert_eq!(door.current_state(), Ok(CurrentState::Open)),
                (false, true) => prop_assert_eq!(door.current_state(), Ok(CurrentState::Closed)),
                (false, false) => {
                    let state = door.current_state().expect("no conflict");
                    prop_assert!(!state.is_terminal());
                }
            }
            if let Ok(status) = door.status() {
                if status.stopped {
                    prop_assert!(!status.open_active && !status.closed_active);
                }
            }
        }

        // Every pulse sequence ends with the relay released.
        clock.advance_ms(10_000);
        door.poll().expect("poll");
        prop_assert!(!relay.state());
    }
}
