#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary text must parse or fail cleanly; accepted configs must
    // validate and convert without panicking.
    let Ok(cfg) = garage_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        let door = garage_core::DoorConfig::from(&cfg);
        let _ = door.failure_timeout();
        let _ = cfg.wired_sensors();
    }
});
