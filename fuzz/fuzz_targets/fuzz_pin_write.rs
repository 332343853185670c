//! Fuzz target: inbound pin-write dispatch.
//!
//! Drives arbitrary pin ids and payload bytes through the full inbound
//! path (decode → store → edge-trigger → handler) and asserts the core
//! never panics and its run state stays internally consistent. This is
//! the surface a hostile or broken dashboard client controls.
//!
//! cargo fuzz run fuzz_pin_write

#![no_main]

use libfuzzer_sys::fuzz_target;

use washcure::config::{OperatorSettings, StationConfig};
use washcure::engine::{ControlEngine, TimerPhase};
use washcure::model::{Channel, Configuration, DataModel, Dataset};
use washcure::sync::{Station, StationIo, SyncDomain};

fuzz_target!(|data: &[u8]| {
    let mut model = DataModel::new();
    let mut cfg = Configuration::new("fuzz", "fuzz.cfg");
    cfg.insert_dataset(
        Channel::Fan,
        Dataset::new("fan", vec![0.0, 30.0], vec![0.0, 1.0], 0.0, 1.0).unwrap(),
    );
    model.push_configuration(cfg);

    let engine = ControlEngine::new(OperatorSettings::default(), 1.0);
    let domain = SyncDomain::new(Station::new(
        StationConfig::default(),
        model,
        engine,
        StationIo::none(),
    ));

    // Interpret the input as (pin, payload-length, payload) records and
    // interleave playback ticks between writes.
    let mut rest = data;
    while rest.len() >= 2 {
        let pin = rest[0];
        let len = (rest[1] as usize).min(rest.len() - 2);
        let (payload, tail) = rest[2..].split_at(len);
        rest = tail;

        let raw = String::from_utf8_lossy(payload);
        domain.handle_pin_write(pin, &raw);
        domain.profile_tick(0.1);
        domain.remote_tick();
    }

    domain.with_lock(|s| {
        let run = s.engine().run();
        match s.engine().phase() {
            TimerPhase::Stopped => assert!(run.current_time().is_none()),
            _ => {
                let t = run.current_time().unwrap();
                let total = run.total_time().unwrap();
                assert!(t >= 0.0 && t <= total);
            }
        }
        for ch in Channel::ALL {
            let v = s.model().live().get(ch);
            assert!((0.0..=1.0).contains(&v));
        }
    });
});
