//! End-to-end station scenarios through the public actor entry points.

use washcure::config::{OperatorSettings, StationConfig};
use washcure::engine::{ControlEngine, TimerPhase};
use washcure::model::{Channel, Configuration, DataModel, Dataset};
use washcure::pins::{id, PinValue};
use washcure::sync::{Station, StationIo, SyncDomain};

use crate::mock_ports::{
    notify_count, CountingDisplay, LinkCall, MemorySettingsStore, RecordingActuator,
    RecordingLink,
};

// ── Fixtures ──────────────────────────────────────────────────

fn profile_library() -> DataModel {
    let mut model = DataModel::new();

    let mut wash = Configuration::new("Standard wash", "wash.cfg");
    wash.insert_dataset(
        Channel::Fan,
        Dataset::new("fan", vec![0.0, 10.0, 20.0], vec![0.0, 1.0, 0.0], 0.0, 1.0).unwrap(),
    );
    wash.insert_dataset(
        Channel::Axis,
        Dataset::new("zaxis", vec![0.0, 20.0], vec![0.1, 0.9], 0.0, 1.0).unwrap(),
    );
    model.push_configuration(wash);

    let mut cure = Configuration::new("UV cure", "cure.cfg");
    cure.insert_dataset(
        Channel::Light,
        Dataset::new("light", vec![0.0, 5.0, 30.0], vec![0.0, 1.0, 1.0], 0.0, 1.0).unwrap(),
    );
    model.push_configuration(cure);

    model
}

struct TestRig {
    domain: SyncDomain,
    writes: crate::mock_ports::WriteLog,
    link: crate::mock_ports::LinkLog,
    redraws: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    saves: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

fn rig() -> TestRig {
    let (actuator, writes) = RecordingActuator::new();
    let (display, redraws) = CountingDisplay::new();
    let (link, link_log) = RecordingLink::new();
    let (store, _slot, saves) = MemorySettingsStore::new();

    let io = StationIo {
        actuators: Some(Box::new(actuator)),
        display: Some(Box::new(display)),
        link: Some(Box::new(link)),
        settings_store: Some(Box::new(store)),
    };
    let engine = ControlEngine::new(OperatorSettings::default(), 1.0);
    let station = Station::new(StationConfig::default(), profile_library(), engine, io);

    TestRig {
        domain: SyncDomain::new(station),
        writes,
        link: link_log,
        redraws,
        saves,
    }
}

fn drain_link(rig: &TestRig) -> Vec<LinkCall> {
    std::mem::take(&mut *rig.link.lock().unwrap())
}

// ── Scenarios ─────────────────────────────────────────────────

#[test]
fn full_auto_run_cycle() {
    let r = rig();

    // Select profile 0 and start from the dashboard.
    r.domain.handle_pin_write(id::ACTIVE_PROFILE, "0");
    r.domain.handle_pin_write(id::START_PAUSE, "1");
    r.domain
        .with_lock(|s| assert_eq!(s.engine().phase(), TimerPhase::Running));

    // Drive the profile ticker to completion (20 s profile, 0.5 s ticks).
    for _ in 0..60 {
        r.domain.profile_tick(0.5);
    }

    r.domain.with_lock(|s| {
        assert_eq!(s.engine().phase(), TimerPhase::Stopped);
        assert_eq!(s.engine().run().current_time(), None);
    });

    // Actuators followed the curve: fan peaked at 1.0 around mid-cycle.
    let writes = r.writes.lock().unwrap();
    assert!(!writes.is_empty());
    let fan_peak = writes
        .iter()
        .filter(|(c, _)| *c == Channel::Fan)
        .map(|(_, v)| *v)
        .fold(0.0, f64::max);
    assert!(fan_peak > 0.9, "fan never reached its peak (max {})", fan_peak);
    // Every write stayed inside the normalized channel range.
    assert!(writes.iter().all(|(_, v)| (0.0..=1.0).contains(v)));
    drop(writes);

    // Exactly one half and one full notification.
    assert_eq!(notify_count(&r.link, "Wash/cure cycle half complete"), 1);
    assert_eq!(notify_count(&r.link, "Wash/cure cycle done"), 1);

    // The display was repainted along the way.
    assert!(r.redraws.load(std::sync::atomic::Ordering::Relaxed) > 10);
}

#[test]
fn stop_after_completion_does_not_renotify() {
    let r = rig();
    r.domain.handle_pin_write(id::ACTIVE_PROFILE, "0");
    r.domain.handle_pin_write(id::START_PAUSE, "1");
    for _ in 0..60 {
        r.domain.profile_tick(0.5);
    }
    assert_eq!(notify_count(&r.link, "Wash/cure cycle done"), 1);

    // Stop again from two different actors; still exactly one notice.
    r.domain.handle_pin_write(id::STOP_TIMER, "1");
    r.domain.profile_tick(0.5);
    assert_eq!(notify_count(&r.link, "Wash/cure cycle done"), 1);
}

#[test]
fn manual_mode_drives_setpoints_directly() {
    let r = rig();
    r.domain.handle_pin_write(id::ACTIVE_PROFILE, "0");
    r.domain.handle_pin_write(id::MANUAL_MODE, "1");

    // Direct value write and a few increments.
    r.domain.handle_pin_write(id::FAN, "0.4");
    r.domain.handle_pin_write(id::FAN_INC, "1");
    r.domain.handle_pin_write(id::FAN_INC, "0"); // release edge, ignored
    r.domain.with_lock(|s| {
        assert!((s.model().live().fan - 0.45).abs() < 1e-9);
    });

    // A running timer in manual mode plays the held setpoints.
    r.domain.handle_pin_write(id::START_PAUSE, "1");
    r.domain.profile_tick(0.5);
    let writes = r.writes.lock().unwrap();
    let fan = writes.iter().rev().find(|(c, _)| *c == Channel::Fan).unwrap();
    assert!((fan.1 - 0.45).abs() < 1e-9);
    drop(writes);

    // Reset-all zeroes everything.
    r.domain.handle_pin_write(id::RESET_ALL, "1");
    r.domain.with_lock(|s| {
        assert_eq!(s.model().live().fan, 0.0);
        assert_eq!(s.model().live().axis, 0.0);
    });
}

#[test]
fn auto_run_rejects_manual_writes_and_corrects_dashboard() {
    let r = rig();
    r.domain.handle_pin_write(id::ACTIVE_PROFILE, "0");
    let _ = drain_link(&r);

    r.domain.handle_pin_write(id::FAN, "0.8");

    // The model never moved, and the authoritative 0.0 went back out.
    r.domain.with_lock(|s| assert_eq!(s.model().live().fan, 0.0));
    let calls = drain_link(&r);
    assert_eq!(calls, vec![LinkCall::Push(id::FAN, PinValue::Float(0.0))]);
}

#[test]
fn disabled_channel_never_reaches_the_actuator() {
    let r = rig();
    r.domain.handle_pin_write(id::ACTIVE_PROFILE, "0");
    r.domain.handle_pin_write(id::FAN_DISABLED, "1");
    r.domain.handle_pin_write(id::START_PAUSE, "1");

    for _ in 0..20 {
        r.domain.profile_tick(0.5);
    }

    let writes = r.writes.lock().unwrap();
    assert!(writes.iter().all(|(c, _)| *c != Channel::Fan));
    assert!(writes.iter().any(|(c, _)| *c == Channel::Axis));
}

#[test]
fn connect_pushes_banner_labels_and_full_state() {
    let r = rig();
    r.domain.handle_connect();
    let calls = drain_link(&r);

    assert!(calls.iter().any(|c| matches!(c, LinkCall::Notify(m) if m == "Wash & cure station online")));

    // Profile names went out as a label list for the selector widget.
    let labels = calls.iter().find_map(|c| match c {
        LinkCall::Property(pin, key, values) if *pin == id::ACTIVE_PROFILE && key == "labels" => {
            Some(values.clone())
        }
        _ => None,
    });
    assert_eq!(labels.unwrap(), vec!["Standard wash".to_string(), "UV cure".to_string()]);

    // Step metadata for every live-value slider.
    for pin in [id::AXIS, id::FAN, id::LIGHT] {
        assert!(calls.iter().any(
            |c| matches!(c, LinkCall::Property(p, key, _) if *p == pin && key == "step")
        ));
    }

    // And a full resync: every pin pushed at least once.
    let pin_count = r.domain.with_lock(|s| s.pins().len());
    let pushed: std::collections::BTreeSet<u8> = calls
        .iter()
        .filter_map(|c| match c {
            LinkCall::Push(p, _) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(pushed.len(), pin_count);
}

#[test]
fn settings_changes_autosave_and_flush_on_shutdown() {
    let r = rig();
    let interval = StationConfig::default();

    r.domain.handle_pin_write(id::LIGHT_DISABLED, "1");
    assert_eq!(r.saves.load(std::sync::atomic::Ordering::Relaxed), 0);

    // Age the dirty flag past the auto-save delay (5 s at 10 Hz).
    let ticks = (interval.settings_autosave_secs * f64::from(interval.remote_tick_hz)) as u32 + 1;
    for _ in 0..ticks {
        r.domain.remote_tick();
    }
    assert_eq!(r.saves.load(std::sync::atomic::Ordering::Relaxed), 1);

    // A fresh change flushed by shutdown even without the delay.
    r.domain.handle_pin_write(id::AUTO_FULL_MUTE, "1");
    r.domain.run_shutdown();
    assert_eq!(r.saves.load(std::sync::atomic::Ordering::Relaxed), 2);
    assert_eq!(notify_count(&r.link, "Wash & cure station offline"), 1);
}

#[test]
fn absent_collaborators_make_operations_noops() {
    let engine = ControlEngine::new(OperatorSettings::default(), 1.0);
    let station = Station::new(
        StationConfig::default(),
        profile_library(),
        engine,
        StationIo::none(),
    );
    let domain = SyncDomain::new(station);

    // The full control surface works with nothing attached.
    domain.handle_connect();
    domain.handle_pin_write(id::ACTIVE_PROFILE, "0");
    domain.handle_pin_write(id::START_PAUSE, "1");
    for _ in 0..60 {
        domain.profile_tick(0.5);
        domain.remote_tick();
    }
    domain.with_lock(|s| assert_eq!(s.engine().phase(), TimerPhase::Stopped));
    domain.run_shutdown();
}

#[test]
fn pause_and_resume_preserve_elapsed_time() {
    let r = rig();
    r.domain.handle_pin_write(id::ACTIVE_PROFILE, "0");
    r.domain.handle_pin_write(id::START_PAUSE, "1");
    for _ in 0..8 {
        r.domain.profile_tick(0.5);
    }

    r.domain.handle_pin_write(id::START_PAUSE, "1"); // pause
    let frozen = r.domain.with_lock(|s| s.engine().run().current_time().unwrap());
    assert!((frozen - 4.0).abs() < 1e-9);

    // Ticks while paused change nothing.
    for _ in 0..10 {
        r.domain.profile_tick(0.5);
    }
    let still = r.domain.with_lock(|s| s.engine().run().current_time().unwrap());
    assert_eq!(frozen, still);

    r.domain.handle_pin_write(id::START_PAUSE, "1"); // resume
    r.domain.profile_tick(0.5);
    let resumed = r.domain.with_lock(|s| s.engine().run().current_time().unwrap());
    assert!((resumed - 4.5).abs() < 1e-9);
}
