//! The synchronization domain — one lock around the whole station.
//!
//! ```text
//!  profile ticker ──┐                       ┌──▶ ActuatorOutput
//!  button events  ──┤   ┌───────────────┐   ├──▶ DisplaySurface
//!  remote ticker  ──┼──▶│ Mutex<Station> │──┤
//!  inbound writes ──┘   └───────────────┘   └──▶ RemoteLink
//! ```
//!
//! Four independent execution contexts touch one data model. Every entry
//! point routes through [`SyncDomain::with_lock`], so mutations from
//! different actors are totally ordered by lock acquisition and no two
//! mutations race. Critical sections are short — bounded by a loop over
//! the pins or the datasets — and never block on I/O: collaborator calls
//! made under the lock are fire-and-forget by contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::buttons::{ButtonEvent, Key, PressKind};
use crate::config::StationConfig;
use crate::engine::{ControlEngine, ControlMode, Notice, TimerPhase};
use crate::model::{Channel, DataModel};
use crate::pins::{Diagnostics, PinClass, PinField, PinRegistry, PinValue, TerminalId, MAX_PINS};
use crate::ports::{ActuatorOutput, ButtonSource, DisplaySurface, RemoteLink, SettingsStore, StoreError};

/// Remote ticks between run-indicator blink toggles (1 Hz at the default
/// 10 Hz mirror rate).
const BLINK_TOGGLE_TICKS: u64 = 5;

// ---------------------------------------------------------------------------
// Collaborator handles
// ---------------------------------------------------------------------------

/// The station's external collaborators. Every handle is optional; an
/// absent collaborator turns the operations that need it into no-ops.
pub struct StationIo {
    pub actuators: Option<Box<dyn ActuatorOutput>>,
    pub display: Option<Box<dyn DisplaySurface>>,
    pub link: Option<Box<dyn RemoteLink>>,
    pub settings_store: Option<Box<dyn SettingsStore>>,
}

impl StationIo {
    /// No collaborators at all — the core still runs.
    pub fn none() -> Self {
        Self {
            actuators: None,
            display: None,
            link: None,
            settings_store: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Station
// ---------------------------------------------------------------------------

/// Everything the lock guards: model, engine, pin table, collaborator
/// handles, and the mirror/persistence bookkeeping.
pub struct Station {
    config: StationConfig,
    model: DataModel,
    engine: ControlEngine,
    pins: PinRegistry,
    io: StationIo,
    diag: Diagnostics,

    // Remote mirror bookkeeping.
    remote_ticks: u64,
    blink_lit: bool,

    // Settings persistence (dirty-flag auto-save).
    settings_dirty: bool,
    dirty_since_tick: u64,

    shutdown_requested: bool,
}

impl Station {
    /// Assemble the station. Persisted operator settings are loaded here
    /// when a store is attached; a missing or corrupt blob falls back to
    /// defaults.
    pub fn new(
        config: StationConfig,
        model: DataModel,
        mut engine: ControlEngine,
        io: StationIo,
    ) -> Self {
        if let Some(store) = io.settings_store.as_ref() {
            match store.load() {
                Ok(settings) => {
                    log::info!("loaded persisted operator settings");
                    engine.load_settings(settings);
                }
                Err(StoreError::NotFound) => {
                    log::info!("no persisted settings; using defaults");
                }
                Err(e) => {
                    log::warn!("settings load failed ({}); using defaults", e);
                }
            }
        }

        Self {
            config,
            model,
            engine,
            pins: PinRegistry::standard(),
            io,
            diag: Diagnostics::default(),
            remote_ticks: 0,
            blink_lit: false,
            settings_dirty: false,
            dirty_since_tick: 0,
            shutdown_requested: false,
        }
    }

    // ── Queries (used by tests and the bootstrap) ─────────────

    pub fn engine(&self) -> &ControlEngine {
        &self.engine
    }

    pub fn model(&self) -> &DataModel {
        &self.model
    }

    pub fn pins(&self) -> &PinRegistry {
        &self.pins
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    // ── Actor entry point: profile ticker ─────────────────────

    /// One playback tick. Advances the engine and applies its outcome to
    /// the collaborators.
    pub fn profile_tick(&mut self, dt: f64) {
        let out = self.engine.tick(&mut self.model, dt);

        if let Some(actuators) = self.io.actuators.as_mut() {
            for (channel, value) in &out.writes {
                actuators.write(*channel, *value);
            }
        }

        for notice in &out.notices {
            self.announce(*notice);
        }

        if out.completed {
            log::info!("profile finished; timer stopped");
            self.push_run_pins();
        }

        if out.redraw {
            self.request_redraw();
        }
    }

    // ── Actor entry point: local buttons ──────────────────────

    /// Apply one debounced front-panel event.
    pub fn handle_button(&mut self, event: ButtonEvent) {
        match (event.key, event.kind) {
            (Key::Select, PressKind::Press) => {
                match self.engine.toggle_start_pause(&self.model) {
                    Ok(()) => self.push_run_pins(),
                    Err(e) => log::warn!("start/pause ignored: {}", e),
                }
            }
            // Holding select stops outright.
            (Key::Select, PressKind::Repeat) => {
                self.engine.stop();
                self.push_run_pins();
            }
            (Key::Up, _) => self.move_selection(-1),
            (Key::Down, _) => self.move_selection(1),
            (Key::Left, _) => self.engine.preview_scrub(-1.0),
            (Key::Right, _) => self.engine.preview_scrub(1.0),
        }
        self.request_redraw();
    }

    /// Step the profile selection. Leaving the preview graph drops the
    /// scrub cursor; changing profiles mid-run aborts the run first.
    fn move_selection(&mut self, delta: i64) {
        self.engine.clear_preview();
        if self.model.is_empty() {
            return;
        }
        let len = self.model.len() as i64;
        let target = match self.model.selected_index() {
            Some(current) => (current as i64 + delta).clamp(0, len - 1),
            None => 0,
        };
        if Some(target as usize) == self.model.selected_index() {
            return;
        }
        if self.engine.phase() != TimerPhase::Stopped {
            log::info!("profile changed during a run; aborting run");
            self.engine.stop();
            self.push_run_pins();
        }
        if self.model.select(target).is_ok() {
            self.push_pin(crate::pins::id::ACTIVE_PROFILE);
        }
    }

    // ── Actor entry point: remote mirror ticker ───────────────

    /// One mirror tick: push live state while running, advance the run
    /// indicator animation, resynchronize the full pin state while
    /// stopped, and drive the settings auto-save.
    pub fn remote_tick(&mut self) {
        self.remote_ticks += 1;

        match self.engine.phase() {
            TimerPhase::Running => {
                let settings = self.engine.settings();
                let data = self.model.current_data(|c| settings.channel_enabled(c));
                for (channel, value) in data {
                    if let Some(pin) = self.pins.pin_for(PinField::LiveValue(channel)) {
                        self.push_raw(pin, &PinValue::Float(value));
                    }
                }
                self.push_pin(crate::pins::id::TIME_REMAINING);
                self.push_pin(crate::pins::id::TIME_SECONDS);
                self.push_pin(crate::pins::id::TIME_MINUTES);

                if self.remote_ticks % BLINK_TOGGLE_TICKS == 0 {
                    self.blink_lit = !self.blink_lit;
                    let level = if self.blink_lit { 255 } else { 0 };
                    self.push_raw(crate::pins::id::RUN_INDICATOR, &PinValue::Int(level));
                }
            }
            TimerPhase::Paused => {
                // Hold the indicator lit while paused.
                if !self.blink_lit {
                    self.blink_lit = true;
                    self.push_raw(crate::pins::id::RUN_INDICATOR, &PinValue::Int(255));
                }
            }
            TimerPhase::Stopped => {
                if self.blink_lit {
                    self.blink_lit = false;
                    self.push_raw(crate::pins::id::RUN_INDICATOR, &PinValue::Int(0));
                }
                // Reconnecting dashboard clients miss incremental pushes;
                // re-send everything on a fixed cadence.
                if self.remote_ticks % self.config.resync_interval_ticks == 0 {
                    self.resync_all();
                }
            }
        }

        self.autosave_if_due();
    }

    // ── Actor entry point: inbound remote writes ──────────────

    /// Dispatch one inbound pin write from the dashboard.
    ///
    /// The value is stored unconditionally (so polling reads return the
    /// latest write); the bound handler runs only when the edge-trigger
    /// policy allows it. A malformed payload is logged and dropped.
    pub fn handle_pin_write(&mut self, pin: u8, raw: &str) {
        let Some(entry) = self.pins.entry(pin) else {
            log::warn!("write to unbound pin {} dropped", pin);
            return;
        };
        let entry = entry.clone();

        let value = match PinRegistry::decode(&entry, raw) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("pin {} write {:?} dropped: {}", pin, raw, e);
                return;
            }
        };

        self.pins.store(pin, value.clone());

        if !PinRegistry::should_dispatch(&entry, &value) {
            log::debug!("pin {} zero write stored, handler suppressed", pin);
            return;
        }

        match entry.field.class() {
            PinClass::Primary => self.primary_pin_write(pin, entry.field, &value),
            PinClass::Edit => self.edit_pin_write(entry.field, &value),
            PinClass::Settings => self.settings_pin_write(entry.field, &value),
        }
    }

    /// Primary-control pins: the hot path between dashboard and engine.
    fn primary_pin_write(&mut self, pin: u8, field: PinField, value: &PinValue) {
        match field {
            PinField::LiveValue(channel) => {
                let v = value.as_f64().unwrap_or(0.0);
                match self.engine.manual_set(&mut self.model, channel, v) {
                    Ok(_) => self.request_redraw(),
                    Err(e) => {
                        log::warn!("pin write to {}: {}", channel, e);
                        // Correct the dashboard's optimistic update.
                        self.push_pin(pin);
                    }
                }
            }
            PinField::ManualIncrement(channel) => {
                let step = self.config.step_for(channel);
                match self.engine.manual_increment(&mut self.model, channel, step) {
                    Ok(_) => {
                        self.push_live_pin(channel);
                        self.request_redraw();
                    }
                    Err(e) => {
                        log::warn!("increment {}: {}", channel, e);
                        self.push_live_pin(channel);
                    }
                }
            }
            PinField::ManualReset(channel) => {
                match self.engine.manual_reset(&mut self.model, channel) {
                    Ok(()) => {
                        self.push_live_pin(channel);
                        self.request_redraw();
                    }
                    Err(e) => {
                        log::warn!("reset {}: {}", channel, e);
                        self.push_live_pin(channel);
                    }
                }
            }
            PinField::ResetAll => match self.engine.reset_all(&mut self.model) {
                Ok(()) => {
                    for channel in Channel::ALL {
                        self.push_live_pin(channel);
                    }
                    self.request_redraw();
                }
                Err(e) => log::warn!("reset all: {}", e),
            },
            PinField::StartPause => match self.engine.toggle_start_pause(&self.model) {
                Ok(()) => {
                    self.push_run_pins();
                    self.request_redraw();
                }
                Err(e) => log::warn!("start/pause ignored: {}", e),
            },
            PinField::StopTimer => {
                self.engine.stop();
                self.push_run_pins();
                self.request_redraw();
            }
            PinField::ManualMode => {
                let mode = if value.is_zero() { ControlMode::AutoRun } else { ControlMode::Manual };
                self.engine.set_mode(mode);
                self.push_mode_pins();
            }
            PinField::AutoMode => {
                let mode = if value.is_zero() { ControlMode::Manual } else { ControlMode::AutoRun };
                self.engine.set_mode(mode);
                self.push_mode_pins();
            }
            PinField::ActiveProfile => {
                let index = value.as_i64().unwrap_or(-1);
                self.select_profile(index);
            }
            PinField::RunIndicator
            | PinField::TimeRemaining
            | PinField::TimeSeconds
            | PinField::TimeMinutes => {
                log::debug!("write to outbound-only pin ignored");
            }
            PinField::Terminal(_) => {} // stored above; nothing to run
            other => log::warn!("pin routed to wrong class: {:?}", other),
        }
    }

    /// Profile-edit pins. Never touches the hot control path.
    fn edit_pin_write(&mut self, field: PinField, value: &PinValue) {
        match field {
            PinField::EditProfile => {
                let index = value.as_i64().unwrap_or(-1);
                if index >= 0 && (index as usize) < self.model.len() {
                    self.engine.set_edit_index(Some(index as usize));
                } else {
                    self.engine.set_edit_index(None);
                }
                self.push_pin(crate::pins::id::EDIT_PROFILE);
            }
            PinField::EditResolution => {
                self.engine.set_resolution(value.as_f64().unwrap_or(0.0));
                self.mark_settings_dirty();
                // Echo back the clamped value.
                self.push_pin(crate::pins::id::EDIT_RESOLUTION);
            }
            PinField::Terminal(_) => {}
            other => log::warn!("pin routed to wrong class: {:?}", other),
        }
    }

    /// Settings pins: operator preferences and the diagnostic block.
    fn settings_pin_write(&mut self, field: PinField, value: &PinValue) {
        match field {
            PinField::ChannelDisabled(channel) => {
                self.engine.set_channel_enabled(channel, value.is_zero());
                self.mark_settings_dirty();
            }
            PinField::NotifyMuted { mode, point } => {
                self.engine.set_notify_muted(mode, point, !value.is_zero());
                self.mark_settings_dirty();
            }
            PinField::PowerOff => {
                log::info!("poweroff requested from dashboard");
                self.engine.stop();
                self.shutdown_requested = true;
            }
            PinField::CpuTemperature | PinField::CpuLoad => {
                log::debug!("write to outbound-only pin ignored");
            }
            PinField::Terminal(_) => {}
            other => log::warn!("pin routed to wrong class: {:?}", other),
        }
    }

    fn select_profile(&mut self, index: i64) {
        let changing = self.model.selected_index().map_or(true, |i| i as i64 != index);
        if changing && self.engine.phase() != TimerPhase::Stopped {
            log::info!("profile changed during a run; aborting run");
            self.engine.stop();
            self.push_run_pins();
        }
        match self.model.select(index) {
            Ok(()) => {
                self.push_pin(crate::pins::id::ACTIVE_PROFILE);
                self.request_redraw();
            }
            Err(e) => {
                log::warn!("profile select: {}", e);
                // Revert the dashboard to the authoritative index.
                self.push_pin(crate::pins::id::ACTIVE_PROFILE);
            }
        }
    }

    // ── Connect / disconnect lifecycle ────────────────────────

    /// Called by the link adapter when the dashboard (re)connects.
    pub fn handle_connect(&mut self) {
        log::info!("dashboard connected");
        if let Some(link) = self.io.link.as_mut() {
            link.notify("Wash & cure station online");
        }

        let banner = format!(
            "Wash & cure station ready\n{} profile(s) loaded\nSelect a profile to begin\n",
            self.model.len()
        );
        self.terminal_line(TerminalId::Main, &banner);

        // Presentation metadata: profile menus and slider steps.
        let names: Vec<String> = self
            .model
            .configurations()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        if let Some(link) = self.io.link.as_mut() {
            link.set_display_property(crate::pins::id::ACTIVE_PROFILE, "labels", &names);
            link.set_display_property(crate::pins::id::EDIT_PROFILE, "labels", &names);
        }
        for channel in Channel::ALL {
            let step = self.config.step_for(channel).to_string();
            if let Some(pin) = self.pins.pin_for(PinField::LiveValue(channel)) {
                if let Some(link) = self.io.link.as_mut() {
                    link.set_display_property(pin, "step", &[step]);
                }
            }
        }

        self.resync_all();
    }

    /// Orderly shutdown: stop playback, park the actuators, flush
    /// settings, say goodbye.
    pub fn shutdown(&mut self) {
        log::info!("station shutting down");
        self.engine.stop();
        if let Some(actuators) = self.io.actuators.as_mut() {
            actuators.all_off();
        }
        self.force_save_if_dirty();
        if let Some(link) = self.io.link.as_mut() {
            link.notify("Wash & cure station offline");
        }
    }

    // ── Diagnostics feed ──────────────────────────────────────

    /// Update the host diagnostics mirrored on the reserved pin block.
    pub fn set_diagnostics(&mut self, cpu_temperature: f64, cpu_load: f64) {
        self.diag = Diagnostics {
            cpu_temperature,
            cpu_load,
        };
    }

    // ── Settings persistence ──────────────────────────────────

    fn mark_settings_dirty(&mut self) {
        if !self.settings_dirty {
            self.settings_dirty = true;
            self.dirty_since_tick = self.remote_ticks;
        }
    }

    /// Save once the dirty state has aged past the auto-save delay.
    fn autosave_if_due(&mut self) {
        if !self.settings_dirty {
            return;
        }
        let ticks = self.remote_ticks.saturating_sub(self.dirty_since_tick);
        let elapsed = ticks as f64 * self.config.remote_tick_secs();
        if elapsed < self.config.settings_autosave_secs {
            return;
        }
        self.save_settings();
    }

    fn force_save_if_dirty(&mut self) {
        if self.settings_dirty {
            self.save_settings();
        }
    }

    fn save_settings(&mut self) {
        let Some(store) = self.io.settings_store.as_ref() else {
            self.settings_dirty = false;
            return;
        };
        match store.save(self.engine.settings()) {
            Ok(()) => {
                self.settings_dirty = false;
                log::info!("operator settings saved");
            }
            Err(e) => log::warn!("settings save failed: {}", e),
        }
    }

    // ── Outbound helpers ──────────────────────────────────────

    fn request_redraw(&mut self) {
        if let Some(display) = self.io.display.as_mut() {
            display.request_redraw();
        }
    }

    fn announce(&mut self, notice: Notice) {
        let message = match notice {
            Notice::HalfComplete => "Wash/cure cycle half complete",
            Notice::CycleDone => "Wash/cure cycle done",
        };
        log::info!("{}", message);
        if let Some(link) = self.io.link.as_mut() {
            link.notify(message);
        }
        self.terminal_line(TerminalId::Main, message);
    }

    /// Mirror a line onto one of the diagnostic text pins.
    fn terminal_line(&mut self, terminal: TerminalId, message: &str) {
        let Some(pin) = self.pins.pin_for(PinField::Terminal(terminal)) else {
            return;
        };
        let value = PinValue::Text(message.to_string());
        self.pins.store(pin, value.clone());
        if let Some(link) = self.io.link.as_mut() {
            link.push(pin, &value);
        }
    }

    /// Encode a pin from the model and push it.
    fn push_pin(&mut self, pin: u8) {
        let Some((_, value)) = self.pins.encode(pin, &self.model, &self.engine, &self.diag) else {
            return;
        };
        if let Some(link) = self.io.link.as_mut() {
            link.push(pin, &value);
        }
    }

    /// Push a value that is not (or not yet) readable from the model,
    /// e.g. a blink level.
    fn push_raw(&mut self, pin: u8, value: &PinValue) {
        if let Some(link) = self.io.link.as_mut() {
            link.push(pin, value);
        }
    }

    fn push_live_pin(&mut self, channel: Channel) {
        if let Some(pin) = self.pins.pin_for(PinField::LiveValue(channel)) {
            self.push_pin(pin);
        }
    }

    fn push_run_pins(&mut self) {
        self.push_pin(crate::pins::id::RUN_INDICATOR);
        self.push_pin(crate::pins::id::TIME_REMAINING);
        self.push_pin(crate::pins::id::TIME_SECONDS);
        self.push_pin(crate::pins::id::TIME_MINUTES);
    }

    fn push_mode_pins(&mut self) {
        self.push_pin(crate::pins::id::MANUAL_MODE);
        self.push_pin(crate::pins::id::AUTO_MODE);
    }

    /// Push every pin — the full-state resynchronization.
    fn resync_all(&mut self) {
        log::debug!("full pin resync");
        let ids: heapless::Vec<u8, MAX_PINS> = self.pins.entries().map(|e| e.id).collect();
        for pin in ids {
            self.push_pin(pin);
        }
    }
}

// ---------------------------------------------------------------------------
// SyncDomain
// ---------------------------------------------------------------------------

/// Shared handle to the station. Clones are cheap; every clone reaches
/// the same lock.
#[derive(Clone)]
pub struct SyncDomain {
    station: Arc<Mutex<Station>>,
    shutdown: Arc<AtomicBool>,
}

impl SyncDomain {
    pub fn new(station: Station) -> Self {
        Self {
            station: Arc::new(Mutex::new(station)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run `op` to completion under the station lock.
    ///
    /// This is the only way in: all four actor entry points funnel
    /// through here, which is what makes their mutations totally
    /// ordered. A poisoned lock is recovered — the guarded operations
    /// hold no partial invariants across a panic boundary.
    pub fn with_lock<R>(&self, op: impl FnOnce(&mut Station) -> R) -> R {
        let mut guard = self
            .station
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let result = op(&mut *guard);
        if guard.shutdown_requested() {
            self.shutdown.store(true, Ordering::Release);
        }
        result
    }

    // ── Actor entry points ────────────────────────────────────

    pub fn profile_tick(&self, dt: f64) {
        self.with_lock(|s| s.profile_tick(dt));
    }

    pub fn remote_tick(&self) {
        self.with_lock(Station::remote_tick);
    }

    pub fn handle_button(&self, event: ButtonEvent) {
        self.with_lock(|s| s.handle_button(event));
    }

    pub fn handle_pin_write(&self, pin: u8, raw: &str) {
        self.with_lock(|s| s.handle_pin_write(pin, raw));
    }

    pub fn handle_connect(&self) {
        self.with_lock(Station::handle_connect);
    }

    pub fn set_diagnostics(&self, cpu_temperature: f64, cpu_load: f64) {
        self.with_lock(|s| s.set_diagnostics(cpu_temperature, cpu_load));
    }

    /// Drain a button source completely (button pump actor body).
    pub fn pump_buttons(&self, source: &mut dyn ButtonSource) {
        while let Some(event) = source.poll() {
            self.handle_button(event);
        }
    }

    // ── Shutdown ──────────────────────────────────────────────

    /// Request an orderly shutdown from any thread.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Observed by every ticker loop.
    pub fn shutdown_pending(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Run the station's shutdown sequence.
    pub fn run_shutdown(&self) {
        self.with_lock(Station::shutdown);
    }
}
