//! Concurrency checks: all four actors hammering the one lock.
//!
//! These tests cannot prove linearizability, but they drive real
//! interleavings and assert that every observable state is one a serial
//! ordering could have produced: valid phase, elapsed time inside
//! bounds, setpoints inside channel ranges, and no deadlock.

use std::thread;

use washcure::buttons::{ButtonEvent, Key, PressKind};
use washcure::config::{OperatorSettings, StationConfig};
use washcure::engine::{ControlEngine, TimerPhase};
use washcure::model::{Channel, Configuration, DataModel, Dataset};
use washcure::pins::id;
use washcure::sync::{Station, StationIo, SyncDomain};

fn domain() -> SyncDomain {
    let mut model = DataModel::new();
    let mut cfg = Configuration::new("soak", "soak.cfg");
    cfg.insert_dataset(
        Channel::Fan,
        Dataset::new("fan", vec![0.0, 50.0, 100.0], vec![0.0, 1.0, 0.0], 0.0, 1.0).unwrap(),
    );
    cfg.insert_dataset(
        Channel::Light,
        Dataset::new("light", vec![0.0, 100.0], vec![0.0, 1.0], 0.0, 1.0).unwrap(),
    );
    model.push_configuration(cfg);

    let engine = ControlEngine::new(OperatorSettings::default(), 1.0);
    SyncDomain::new(Station::new(
        StationConfig::default(),
        model,
        engine,
        StationIo::none(),
    ))
}

/// Invariants that must hold after any interleaving.
fn assert_state_valid(domain: &SyncDomain) {
    domain.with_lock(|s| {
        let run = s.engine().run();
        match s.engine().phase() {
            TimerPhase::Stopped => {
                assert_eq!(run.current_time(), None);
                assert_eq!(run.total_time(), None);
            }
            TimerPhase::Running | TimerPhase::Paused => {
                let t = run.current_time().unwrap();
                let total = run.total_time().unwrap();
                assert!(t >= 0.0 && t <= total + 1.0, "t={} total={}", t, total);
            }
        }
        for ch in Channel::ALL {
            let v = s.model().live().get(ch);
            assert!((0.0..=1.0).contains(&v), "{} out of range: {}", ch, v);
        }
    });
}

#[test]
fn profile_ticks_race_inbound_writes() {
    let d = domain();
    d.handle_pin_write(id::ACTIVE_PROFILE, "0");

    let ticker = {
        let d = d.clone();
        thread::spawn(move || {
            for _ in 0..2000 {
                d.profile_tick(0.05);
            }
        })
    };
    let dashboard = {
        let d = d.clone();
        thread::spawn(move || {
            for i in 0..500 {
                match i % 5 {
                    0 => d.handle_pin_write(id::START_PAUSE, "1"),
                    1 => d.handle_pin_write(id::MANUAL_MODE, "1"),
                    2 => d.handle_pin_write(id::FAN, "0.5"),
                    3 => d.handle_pin_write(id::MANUAL_MODE, "0"),
                    _ => d.handle_pin_write(id::STOP_TIMER, "1"),
                }
            }
        })
    };
    let mirror = {
        let d = d.clone();
        thread::spawn(move || {
            for _ in 0..500 {
                d.remote_tick();
            }
        })
    };
    let panel = {
        let d = d.clone();
        thread::spawn(move || {
            for i in 0..300 {
                let key = if i % 2 == 0 { Key::Select } else { Key::Right };
                d.handle_button(ButtonEvent {
                    key,
                    kind: PressKind::Press,
                });
            }
        })
    };

    ticker.join().unwrap();
    dashboard.join().unwrap();
    mirror.join().unwrap();
    panel.join().unwrap();

    assert_state_valid(&d);
}

#[test]
fn stop_is_safe_and_idempotent_from_every_actor() {
    let d = domain();
    d.handle_pin_write(id::ACTIVE_PROFILE, "0");
    d.handle_pin_write(id::START_PAUSE, "1");

    let stoppers: Vec<_> = (0..4)
        .map(|i| {
            let d = d.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    if i % 2 == 0 {
                        d.handle_pin_write(id::STOP_TIMER, "1");
                    } else {
                        d.handle_button(ButtonEvent {
                            key: Key::Select,
                            kind: PressKind::Repeat,
                        });
                    }
                }
            })
        })
        .collect();
    for t in stoppers {
        t.join().unwrap();
    }

    d.with_lock(|s| {
        assert_eq!(s.engine().phase(), TimerPhase::Stopped);
        assert_eq!(s.engine().run().current_time(), None);
    });
    assert_state_valid(&d);
}

#[test]
fn malformed_write_storm_never_crashes_the_tickers() {
    let d = domain();
    d.handle_pin_write(id::ACTIVE_PROFILE, "0");
    d.handle_pin_write(id::START_PAUSE, "1");

    let garbage = {
        let d = d.clone();
        thread::spawn(move || {
            for i in 0..1000u32 {
                let pin = (i % 256) as u8;
                d.handle_pin_write(pin, "definitely-not-a-number");
            }
        })
    };
    let ticker = {
        let d = d.clone();
        thread::spawn(move || {
            for _ in 0..1000 {
                d.profile_tick(0.01);
                d.remote_tick();
            }
        })
    };

    garbage.join().unwrap();
    ticker.join().unwrap();
    assert_state_valid(&d);
}
