use garage_hardware::{DigitalInput, Relay, SimInput, SimRelay};
use rstest::rstest;

#[rstest]
#[case(&[true, false], 1)]
#[case(&[true, false, true, false], 2)]
#[case(&[false, false], 0)]
#[case(&[true, true, false], 1)]
fn pulses_follow_rising_edges(#[case] writes: &[bool], #[case] expected: usize) {
    let mut relay = SimRelay::new();
    for &on in writes {
        if on {
            relay.turn_on().unwrap();
        } else {
            relay.turn_off().unwrap();
        }
    }
    assert_eq!(relay.pulses(), expected);
    assert_eq!(relay.history(), writes.to_vec());
}

#[test]
fn boxed_input_reads_through() {
    let input = SimInput::new(true);
    let boxed: Box<dyn DigitalInput> = Box::new(input.clone());
    assert!(boxed.is_active().unwrap());
    input.set(false);
    assert!(!boxed.is_active().unwrap());
}

#[test]
fn failing_relay_reports_gpio_error() {
    let mut relay = SimRelay::new();
    relay.set_failing(true);
    let err = relay.turn_off().expect_err("relay should fail");
    assert!(err.to_string().contains("gpio error"));
}
