//! Wash/cure station — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  profile_store    settings_store     log_sink                │
//! │  (JSON folder)    (SettingsStore)    (Actuator/Display/Link) │
//! │                                                              │
//! │  ───────────────── Port Trait Boundary ─────────────────     │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │          SyncDomain (one lock, four actors)            │  │
//! │  │     DataModel · ControlEngine · PinRegistry            │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  actors: profile ticker · remote ticker · button pump        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deployments swap the log adapters for real GPIO/PWM and dashboard
//! transports; the wiring below is everything the core needs to run.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use log::info;

use washcure::actors;
use washcure::adapters::log_sink::{LogActuator, LogDisplay, LogRemoteLink};
use washcure::adapters::profile_store;
use washcure::adapters::settings_store::FileSettingsStore;
use washcure::config::{OperatorSettings, StationConfig};
use washcure::engine::ControlEngine;
use washcure::model::DataModel;
use washcure::sync::{Station, StationIo, SyncDomain};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = StationConfig::default();
    info!("wash/cure station v{}", env!("CARGO_PKG_VERSION"));

    // ── Profile library ───────────────────────────────────────
    let mut model = DataModel::new();
    let profile_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.profile_dir.clone());
    let loaded = profile_store::load_profile_dir(&mut model, Path::new(&profile_dir));
    info!("{} profile(s) loaded from {}", loaded, profile_dir);

    // ── Core assembly ─────────────────────────────────────────
    let engine = ControlEngine::new(OperatorSettings::default(), config.full_notify_window_secs);
    let io = StationIo {
        actuators: Some(Box::new(LogActuator)),
        display: Some(Box::new(LogDisplay)),
        link: Some(Box::new(LogRemoteLink)),
        settings_store: Some(Box::new(FileSettingsStore::new("settings.bin"))),
    };
    let domain = SyncDomain::new(Station::new(config.clone(), model, engine, io));

    // The log link is always "connected".
    domain.handle_connect();

    // ── Actors ────────────────────────────────────────────────
    let handles = actors::spawn_all(&domain, &config, None)?;
    info!("actors running; waiting for poweroff request");

    while !domain.shutdown_pending() {
        thread::sleep(Duration::from_millis(200));
    }

    // ── Orderly shutdown ──────────────────────────────────────
    handles.join();
    domain.run_shutdown();
    info!("station stopped");
    Ok(())
}
