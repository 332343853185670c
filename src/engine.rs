//! Control-mode / timer state machine and profile playback.
//!
//! ```text
//!             start_or_resume            pause
//!   Stopped ──────────────────▶ Running ───────▶ Paused
//!      ▲                          │   ▲            │
//!      │         stop             │   └────────────┘
//!      └──────────────────────────┘  start_or_resume
//! ```
//!
//! Orthogonal to the timer phase, the engine is in one of two control
//! modes: auto-run (actuators follow profile interpolation) or manual
//! (direct operator setpoints). The engine itself is pure state logic —
//! it never touches a port. Each tick returns a [`TickOutcome`] that the
//! synchronization domain applies to the actuator, display, and remote
//! collaborators.

use crate::config::{
    OperatorSettings, TIME_RESOLUTION_MAX, TIME_RESOLUTION_MIN, TIME_RESOLUTION_STEP,
};
use crate::error::{ControlError, Result};
use crate::model::{Channel, DataModel};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// What drives the actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Actuators follow profile interpolation.
    AutoRun,
    /// Actuators follow direct operator setpoints.
    Manual,
}

/// Playback timer phase. Replaces the recorded `-1` time sentinel with an
/// explicit state; the sentinel survives only at the wire boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Stopped,
    Running,
    Paused,
}

/// Which completion notification a mute flag addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyPoint {
    Half,
    Full,
}

/// Timer state. `current_time`/`total_time` are meaningful only while
/// the phase is Running or Paused.
#[derive(Debug, Clone, Copy)]
pub struct RunState {
    pub mode: ControlMode,
    pub phase: TimerPhase,
    current_time: f64,
    total_time: f64,
    half_notified: bool,
    full_notified: bool,
}

impl RunState {
    fn new() -> Self {
        Self {
            mode: ControlMode::AutoRun,
            phase: TimerPhase::Stopped,
            current_time: 0.0,
            total_time: 0.0,
            half_notified: false,
            full_notified: false,
        }
    }

    /// Elapsed playback time; `None` while stopped.
    pub fn current_time(&self) -> Option<f64> {
        match self.phase {
            TimerPhase::Stopped => None,
            _ => Some(self.current_time),
        }
    }

    /// Total profile runtime; `None` while stopped.
    pub fn total_time(&self) -> Option<f64> {
        match self.phase {
            TimerPhase::Stopped => None,
            _ => Some(self.total_time),
        }
    }

    /// Remaining playback time; `None` while stopped.
    pub fn remaining(&self) -> Option<f64> {
        match self.phase {
            TimerPhase::Stopped => None,
            _ => Some((self.total_time - self.current_time).max(0.0)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tick outcome
// ---------------------------------------------------------------------------

/// Notifications raised by a tick, in raise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Elapsed time crossed half the profile runtime.
    HalfComplete,
    /// The cycle finished (fires at most once per run).
    CycleDone,
}

/// Everything one playback tick asks the outside world to do.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Channel values to forward to the actuator output, already clamped.
    pub writes: heapless::Vec<(Channel, f64), 3>,
    /// Whether the display should repaint.
    pub redraw: bool,
    /// Notifications to push to the remote link.
    pub notices: heapless::Vec<Notice, 2>,
    /// The run ended on this tick.
    pub completed: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The control engine: timer state machine, notification policy, channel
/// enables, manual adjustment, and the stopped-state preview cursor.
pub struct ControlEngine {
    run: RunState,
    settings: OperatorSettings,
    /// Completion notice fires inside this window before the end.
    full_notify_window: f64,
    /// Preview cursor time while scrubbing a stopped profile.
    preview_time: Option<f64>,
    /// Profile index previewed on the edit page.
    edit_index: Option<usize>,
}

impl ControlEngine {
    pub fn new(settings: OperatorSettings, full_notify_window: f64) -> Self {
        Self {
            run: RunState::new(),
            settings,
            full_notify_window,
            preview_time: None,
            edit_index: None,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn mode(&self) -> ControlMode {
        self.run.mode
    }

    pub fn phase(&self) -> TimerPhase {
        self.run.phase
    }

    pub fn settings(&self) -> &OperatorSettings {
        &self.settings
    }

    pub fn preview_time(&self) -> Option<f64> {
        self.preview_time
    }

    pub fn edit_index(&self) -> Option<usize> {
        self.edit_index
    }

    // ── Timer transitions ─────────────────────────────────────

    /// Single-button start/pause semantics:
    /// Stopped → Running (reset), Paused → Running (resume from the
    /// frozen time), Running → Paused. Starting requires a selected
    /// profile.
    pub fn start_or_resume(&mut self, model: &DataModel) -> Result<()> {
        match self.run.phase {
            TimerPhase::Running => {
                self.pause();
                Ok(())
            }
            TimerPhase::Paused => {
                self.run.phase = TimerPhase::Running;
                log::info!("resuming profile at {:.2}s", self.run.current_time);
                Ok(())
            }
            TimerPhase::Stopped => {
                let total = model.total_time().ok_or(ControlError::NoConfiguration)?;
                self.run.current_time = 0.0;
                self.run.total_time = total;
                self.run.half_notified = false;
                self.run.full_notified = false;
                self.run.phase = TimerPhase::Running;
                self.preview_time = None;
                log::info!("starting profile (total {:.1}s)", total);
                Ok(())
            }
        }
    }

    /// Alias carrying the physical button's name for the same transition.
    pub fn toggle_start_pause(&mut self, model: &DataModel) -> Result<()> {
        self.start_or_resume(model)
    }

    /// Freeze playback; the ticker stops advancing time.
    pub fn pause(&mut self) {
        if self.run.phase == TimerPhase::Running {
            self.run.phase = TimerPhase::Paused;
            log::info!("pausing profile at {:.2}s", self.run.current_time);
        }
    }

    /// Stop playback and clear the display cursor state. Idempotent and
    /// safe from any actor; stopping an already-stopped engine changes
    /// nothing and never re-fires a completion notice.
    pub fn stop(&mut self) {
        if self.run.phase != TimerPhase::Stopped {
            log::info!("stopping profile");
        }
        self.run.phase = TimerPhase::Stopped;
        self.run.current_time = 0.0;
        self.preview_time = None;
    }

    /// Switch between auto-run and manual control. Independent of the
    /// timer phase; the live setpoints simply stop (or resume) following
    /// interpolation.
    pub fn set_mode(&mut self, mode: ControlMode) {
        if self.run.mode != mode {
            log::info!("control mode -> {:?}", mode);
            self.run.mode = mode;
        }
    }

    // ── Per-tick playback ─────────────────────────────────────

    /// Advance playback by `dt` seconds. No-op unless Running.
    pub fn tick(&mut self, model: &mut DataModel, dt: f64) -> TickOutcome {
        let mut out = TickOutcome::default();
        if self.run.phase != TimerPhase::Running {
            return out;
        }

        self.run.current_time += dt;
        let t = self.run.current_time;
        let total = self.run.total_time;

        if t >= total / 2.0 && !self.run.half_notified && !self.notify_muted(NotifyPoint::Half) {
            self.run.half_notified = true;
            let _ = out.notices.push(Notice::HalfComplete);
        }

        if total - t < self.full_notify_window
            && !self.run.full_notified
            && !self.notify_muted(NotifyPoint::Full)
        {
            self.run.full_notified = true;
            let _ = out.notices.push(Notice::CycleDone);
            self.stop();
            out.completed = true;
            out.redraw = true;
            return out;
        }

        if t > total {
            // Backstop for a muted (or already-delivered) completion
            // notice: stop without raising a second one.
            self.stop();
            out.completed = true;
            out.redraw = true;
            return out;
        }

        if self.run.mode == ControlMode::AutoRun {
            let settings = &self.settings;
            model.refresh_from_profile(t, |c| settings.channel_enabled(c));
        }
        let settings = &self.settings;
        out.writes = model.current_data(|c| settings.channel_enabled(c));
        out.redraw = true;
        out
    }

    fn notify_muted(&self, point: NotifyPoint) -> bool {
        match (self.run.mode, point) {
            (ControlMode::Manual, NotifyPoint::Half) => self.settings.manual_half_notify_muted,
            (ControlMode::Manual, NotifyPoint::Full) => self.settings.manual_full_notify_muted,
            (ControlMode::AutoRun, NotifyPoint::Half) => self.settings.auto_half_notify_muted,
            (ControlMode::AutoRun, NotifyPoint::Full) => self.settings.auto_full_notify_muted,
        }
    }

    // ── Manual adjustment ─────────────────────────────────────

    fn require_manual(&self) -> Result<()> {
        match self.run.mode {
            ControlMode::Manual => Ok(()),
            ControlMode::AutoRun => Err(ControlError::WrongMode),
        }
    }

    /// Overwrite one live setpoint. Manual mode only; returns the value
    /// actually stored (after clamping).
    pub fn manual_set(&self, model: &mut DataModel, channel: Channel, value: f64) -> Result<f64> {
        self.require_manual()?;
        model.set_live(channel, value);
        Ok(model.live().get(channel))
    }

    /// Bump one live setpoint by `step`. Manual mode only.
    pub fn manual_increment(
        &self,
        model: &mut DataModel,
        channel: Channel,
        step: f64,
    ) -> Result<f64> {
        self.require_manual()?;
        let next = model.live().get(channel) + step;
        model.set_live(channel, next);
        Ok(model.live().get(channel))
    }

    /// Zero one live setpoint. Manual mode only.
    pub fn manual_reset(&self, model: &mut DataModel, channel: Channel) -> Result<()> {
        self.require_manual()?;
        model.set_live(channel, 0.0);
        Ok(())
    }

    /// Zero every live setpoint. Manual mode only.
    pub fn reset_all(&self, model: &mut DataModel) -> Result<()> {
        self.require_manual()?;
        for channel in Channel::ALL {
            model.set_live(channel, 0.0);
        }
        Ok(())
    }

    // ── Settings ──────────────────────────────────────────────

    pub fn set_channel_enabled(&mut self, channel: Channel, enabled: bool) {
        self.settings.set_channel_enabled(channel, enabled);
        log::info!("channel {} {}", channel, if enabled { "enabled" } else { "disabled" });
    }

    pub fn set_notify_muted(&mut self, mode: ControlMode, point: NotifyPoint, muted: bool) {
        match (mode, point) {
            (ControlMode::Manual, NotifyPoint::Half) => {
                self.settings.manual_half_notify_muted = muted;
            }
            (ControlMode::Manual, NotifyPoint::Full) => {
                self.settings.manual_full_notify_muted = muted;
            }
            (ControlMode::AutoRun, NotifyPoint::Half) => {
                self.settings.auto_half_notify_muted = muted;
            }
            (ControlMode::AutoRun, NotifyPoint::Full) => {
                self.settings.auto_full_notify_muted = muted;
            }
        }
    }

    /// Replace the whole settings block (used when loading persisted
    /// settings at startup).
    pub fn load_settings(&mut self, settings: OperatorSettings) {
        self.settings = settings;
    }

    /// Adjust the preview resolution by whole steps, clamped to its
    /// documented bounds.
    pub fn adjust_resolution(&mut self, steps: f64) {
        let next = self.settings.time_resolution_secs + steps * TIME_RESOLUTION_STEP;
        self.settings.time_resolution_secs = next.clamp(TIME_RESOLUTION_MIN, TIME_RESOLUTION_MAX);
    }

    /// Set the preview resolution directly (dashboard edit pin), clamped.
    pub fn set_resolution(&mut self, secs: f64) {
        self.settings.time_resolution_secs = secs.clamp(TIME_RESOLUTION_MIN, TIME_RESOLUTION_MAX);
    }

    // ── Preview cursor ────────────────────────────────────────

    /// Scrub the preview cursor while stopped. `direction` is ±1; the
    /// step is one eighth of a grid subdivision of the current
    /// resolution.
    pub fn preview_scrub(&mut self, direction: f64) {
        if self.run.phase != TimerPhase::Stopped {
            return;
        }
        let step = self.settings.time_resolution_secs / 80.0;
        let t = self.preview_time.unwrap_or(0.0) + direction * step;
        self.preview_time = Some(t.max(0.0));
    }

    /// Leave the preview; the cursor disappears from the display.
    pub fn clear_preview(&mut self) {
        self.preview_time = None;
    }

    /// Set the profile index previewed on the edit page.
    pub fn set_edit_index(&mut self, index: Option<usize>) {
        self.edit_index = index;
    }
}
