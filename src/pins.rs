//! Virtual-pin registry for the remote dashboard protocol.
//!
//! Single source of truth — every dashboard-facing value lives on exactly
//! one numbered pin, bound at construction to one typed model field.
//! Change a binding here and it propagates everywhere.
//!
//! Pins partition into three handler classes, fixed when the table is
//! built: primary control (the hot path), profile edit, and settings.
//! Dispatch is an exhaustive match over the closed [`PinField`] enum —
//! there is no string-keyed lookup anywhere on the write path.
//!
//! The high ids 250–255 are reserved for diagnostic text channels (log
//! mirror, status line) rather than control fields.

use core::fmt;

use crate::engine::{ControlEngine, ControlMode, NotifyPoint, TimerPhase};
use crate::error::{ControlError, Result};
use crate::model::{Channel, DataModel};

// ---------------------------------------------------------------------------
// Pin number assignments
// ---------------------------------------------------------------------------

/// Dashboard pin numbers. Layout is contractual with the deployed
/// dashboard project; renumbering breaks existing installs.
pub mod id {
    pub const AXIS: u8 = 0;
    pub const FAN: u8 = 1;
    pub const LIGHT: u8 = 2;

    pub const AXIS_INC: u8 = 3;
    pub const FAN_INC: u8 = 4;
    pub const LIGHT_INC: u8 = 5;
    pub const AXIS_RST: u8 = 6;
    pub const FAN_RST: u8 = 7;
    pub const LIGHT_RST: u8 = 8;

    pub const RESET_ALL: u8 = 9;
    pub const START_PAUSE: u8 = 10;
    pub const MANUAL_MODE: u8 = 12;

    pub const TIME_REMAINING: u8 = 13;
    pub const TIME_SECONDS: u8 = 14;
    pub const TIME_MINUTES: u8 = 15;

    pub const AUTO_MODE: u8 = 16;
    pub const ACTIVE_PROFILE: u8 = 17;
    pub const RUN_INDICATOR: u8 = 18;

    pub const EDIT_PROFILE: u8 = 20;
    pub const EDIT_RESOLUTION: u8 = 21;

    pub const AXIS_DISABLED: u8 = 44;
    pub const FAN_DISABLED: u8 = 45;
    pub const LIGHT_DISABLED: u8 = 46;
    pub const MANUAL_HALF_MUTE: u8 = 47;
    pub const MANUAL_FULL_MUTE: u8 = 48;
    pub const AUTO_HALF_MUTE: u8 = 49;
    pub const AUTO_FULL_MUTE: u8 = 50;

    pub const STOP_TIMER: u8 = 51;

    // Reserved diagnostic block.
    pub const CPU_TEMPERATURE: u8 = 250;
    pub const CPU_LOAD: u8 = 251;
    pub const POWER_OFF: u8 = 252;
    pub const EDIT_TERMINAL: u8 = 253;
    pub const SETTINGS_TERMINAL: u8 = 254;
    pub const MAIN_TERMINAL: u8 = 255;
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A value carried on the pin channel. `Text` appears only on the
/// reserved diagnostic ids.
#[derive(Debug, Clone, PartialEq)]
pub enum PinValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl PinValue {
    /// The zero-equivalent test used by the `ignore_zero` policy.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(v) => *v == 0,
            Self::Float(v) => *v == 0.0,
            Self::Text(s) => s.is_empty(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            Self::Text(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// The three diagnostic text channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalId {
    Main,
    Settings,
    Edit,
}

/// Every model field addressable over the pin namespace. Closed set;
/// dispatch is an exhaustive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinField {
    /// Live channel setpoint (read/write; writes require manual mode).
    LiveValue(Channel),
    /// Momentary: bump a channel by its configured step.
    ManualIncrement(Channel),
    /// Momentary: zero a channel.
    ManualReset(Channel),
    /// Momentary: zero every channel.
    ResetAll,
    /// Momentary: single-button start/pause toggle.
    StartPause,
    /// Momentary: stop playback.
    StopTimer,
    /// Level: nonzero selects manual mode.
    ManualMode,
    /// Level: nonzero selects auto-run mode.
    AutoMode,
    /// Active profile index (−1 on the wire = none selected).
    ActiveProfile,
    /// Run indicator LED (outbound only; blinks while running).
    RunIndicator,
    /// Remaining/elapsed time mirrors (outbound only; −1 while stopped).
    TimeRemaining,
    TimeSeconds,
    TimeMinutes,
    /// Profile index previewed on the edit page.
    EditProfile,
    /// Preview graph resolution in seconds.
    EditResolution,
    /// Level: nonzero parks the channel (excluded from playback).
    ChannelDisabled(Channel),
    /// Level: nonzero mutes one completion notification for one mode.
    NotifyMuted { mode: ControlMode, point: NotifyPoint },
    /// CPU diagnostics mirrored for the dashboard gauges.
    CpuTemperature,
    CpuLoad,
    /// Momentary: request an orderly shutdown.
    PowerOff,
    /// Diagnostic text channel.
    Terminal(TerminalId),
}

/// Handler class a pin routes to. Fixed at registry construction so that
/// edit/settings writes never touch the hot control path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinClass {
    Primary,
    Edit,
    Settings,
}

impl PinField {
    pub fn class(self) -> PinClass {
        match self {
            Self::EditProfile | Self::EditResolution | Self::Terminal(TerminalId::Edit) => {
                PinClass::Edit
            }
            Self::ChannelDisabled(_)
            | Self::NotifyMuted { .. }
            | Self::CpuTemperature
            | Self::CpuLoad
            | Self::PowerOff
            | Self::Terminal(TerminalId::Settings) => PinClass::Settings,
            _ => PinClass::Primary,
        }
    }

    /// Inbound values coerce to `i64` when set, `f64` otherwise.
    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            Self::LiveValue(_) | Self::CpuTemperature | Self::CpuLoad | Self::Terminal(_)
        )
    }

    /// Text channels bypass numeric coercion entirely.
    pub fn is_text(self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// Momentary dashboard controls write a nonzero value on press and a
    /// zero on release; the release must not re-trigger the handler.
    pub fn ignore_zero(self) -> bool {
        matches!(
            self,
            Self::ManualIncrement(_)
                | Self::ManualReset(_)
                | Self::ResetAll
                | Self::StartPause
                | Self::StopTimer
                | Self::PowerOff
        )
    }

    fn initial_value(self) -> PinValue {
        if self.is_text() {
            PinValue::Text(String::new())
        } else if self.is_integer() {
            PinValue::Int(0)
        } else {
            PinValue::Float(0.0)
        }
    }
}

// ---------------------------------------------------------------------------
// Entries and registry
// ---------------------------------------------------------------------------

/// One row of the pin table.
#[derive(Debug, Clone)]
pub struct PinEntry {
    pub id: u8,
    pub field: PinField,
    pub is_integer: bool,
    pub ignore_zero: bool,
    /// Last value seen on the pin (inbound or pushed), so polling reads
    /// return the latest write even when the handler was suppressed.
    pub last_value: PinValue,
}

/// Upper bound on table size; the standard table uses 32 rows.
pub const MAX_PINS: usize = 40;

/// The station's pin table. Built once at startup, read-mostly after —
/// only `last_value` cells move at runtime.
pub struct PinRegistry {
    entries: heapless::Vec<PinEntry, MAX_PINS>,
}

impl PinRegistry {
    /// Build the standard station table. The id↔field mapping must be a
    /// bijection; construction checks it in debug builds and
    /// [`check_bijection`](Self::check_bijection) exposes it to tests.
    pub fn standard() -> Self {
        let mut reg = Self {
            entries: heapless::Vec::new(),
        };

        let bindings: [(u8, PinField); 32] = [
            (id::AXIS, PinField::LiveValue(Channel::Axis)),
            (id::FAN, PinField::LiveValue(Channel::Fan)),
            (id::LIGHT, PinField::LiveValue(Channel::Light)),
            (id::AXIS_INC, PinField::ManualIncrement(Channel::Axis)),
            (id::FAN_INC, PinField::ManualIncrement(Channel::Fan)),
            (id::LIGHT_INC, PinField::ManualIncrement(Channel::Light)),
            (id::AXIS_RST, PinField::ManualReset(Channel::Axis)),
            (id::FAN_RST, PinField::ManualReset(Channel::Fan)),
            (id::LIGHT_RST, PinField::ManualReset(Channel::Light)),
            (id::RESET_ALL, PinField::ResetAll),
            (id::START_PAUSE, PinField::StartPause),
            (id::MANUAL_MODE, PinField::ManualMode),
            (id::TIME_REMAINING, PinField::TimeRemaining),
            (id::TIME_SECONDS, PinField::TimeSeconds),
            (id::TIME_MINUTES, PinField::TimeMinutes),
            (id::AUTO_MODE, PinField::AutoMode),
            (id::ACTIVE_PROFILE, PinField::ActiveProfile),
            (id::RUN_INDICATOR, PinField::RunIndicator),
            (id::EDIT_PROFILE, PinField::EditProfile),
            (id::EDIT_RESOLUTION, PinField::EditResolution),
            (id::AXIS_DISABLED, PinField::ChannelDisabled(Channel::Axis)),
            (id::FAN_DISABLED, PinField::ChannelDisabled(Channel::Fan)),
            (id::LIGHT_DISABLED, PinField::ChannelDisabled(Channel::Light)),
            (
                id::MANUAL_HALF_MUTE,
                PinField::NotifyMuted {
                    mode: ControlMode::Manual,
                    point: NotifyPoint::Half,
                },
            ),
            (
                id::MANUAL_FULL_MUTE,
                PinField::NotifyMuted {
                    mode: ControlMode::Manual,
                    point: NotifyPoint::Full,
                },
            ),
            (
                id::AUTO_HALF_MUTE,
                PinField::NotifyMuted {
                    mode: ControlMode::AutoRun,
                    point: NotifyPoint::Half,
                },
            ),
            (
                id::AUTO_FULL_MUTE,
                PinField::NotifyMuted {
                    mode: ControlMode::AutoRun,
                    point: NotifyPoint::Full,
                },
            ),
            (id::STOP_TIMER, PinField::StopTimer),
            (id::CPU_TEMPERATURE, PinField::CpuTemperature),
            (id::CPU_LOAD, PinField::CpuLoad),
            (id::POWER_OFF, PinField::PowerOff),
            (id::MAIN_TERMINAL, PinField::Terminal(TerminalId::Main)),
        ];

        for (pin, field) in bindings {
            reg.bind(pin, field);
        }
        // The remaining terminals share the reserved block.
        reg.bind(id::SETTINGS_TERMINAL, PinField::Terminal(TerminalId::Settings));
        reg.bind(id::EDIT_TERMINAL, PinField::Terminal(TerminalId::Edit));

        debug_assert!(reg.check_bijection(), "pin table is not a bijection");
        reg
    }

    fn bind(&mut self, pin: u8, field: PinField) {
        let entry = PinEntry {
            id: pin,
            field,
            is_integer: field.is_integer(),
            ignore_zero: field.ignore_zero(),
            last_value: field.initial_value(),
        };
        assert!(self.entries.push(entry).is_ok(), "pin table capacity exceeded");
    }

    /// True iff no id and no field appears twice.
    pub fn check_bijection(&self) -> bool {
        for (i, a) in self.entries.iter().enumerate() {
            for b in &self.entries[i + 1..] {
                if a.id == b.id || a.field == b.field {
                    return false;
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &PinEntry> {
        self.entries.iter()
    }

    pub fn entry(&self, pin: u8) -> Option<&PinEntry> {
        self.entries.iter().find(|e| e.id == pin)
    }

    /// Pin bound to a field (reverse lookup; the bijection makes it
    /// unique).
    pub fn pin_for(&self, field: PinField) -> Option<u8> {
        self.entries.iter().find(|e| e.field == field).map(|e| e.id)
    }

    /// Record the latest value seen on a pin.
    pub fn store(&mut self, pin: u8, value: PinValue) {
        if let Some(e) = self.entries.iter_mut().find(|e| e.id == pin) {
            e.last_value = value;
        }
    }

    // ── Wire coercion ─────────────────────────────────────────

    /// Coerce an inbound wire payload to the entry's bound type.
    ///
    /// A failure here is the caller's signal to drop the write and log —
    /// a single malformed inbound message must never take the engine
    /// down.
    pub fn decode(entry: &PinEntry, raw: &str) -> Result<PinValue> {
        if entry.field.is_text() {
            return Ok(PinValue::Text(raw.to_string()));
        }
        let v: f64 = raw
            .trim()
            .parse()
            .map_err(|_| ControlError::BadValue("payload is not numeric"))?;
        if !v.is_finite() {
            return Err(ControlError::BadValue("payload is not finite"));
        }
        if entry.is_integer {
            Ok(PinValue::Int(v as i64))
        } else {
            Ok(PinValue::Float(v))
        }
    }

    /// Edge-trigger policy: a zero-equivalent write on an `ignore_zero`
    /// pin is stored but must not invoke the bound handler.
    pub fn should_dispatch(entry: &PinEntry, value: &PinValue) -> bool {
        !(entry.ignore_zero && value.is_zero())
    }

    /// Read a pin's bound field and coerce it for the wire.
    /// Returns `(is_integer, value)`; `None` for an unbound id.
    pub fn encode(
        &self,
        pin: u8,
        model: &DataModel,
        engine: &ControlEngine,
        diag: &Diagnostics,
    ) -> Option<(bool, PinValue)> {
        let entry = self.entry(pin)?;
        let run = engine.run();
        let settings = engine.settings();

        let value = match entry.field {
            PinField::LiveValue(ch) => PinValue::Float(model.live().get(ch)),

            // Momentary controls always read back released.
            PinField::ManualIncrement(_)
            | PinField::ManualReset(_)
            | PinField::ResetAll
            | PinField::StartPause
            | PinField::StopTimer
            | PinField::PowerOff => PinValue::Int(0),

            PinField::ManualMode => PinValue::Int(i64::from(run.mode == ControlMode::Manual)),
            PinField::AutoMode => PinValue::Int(i64::from(run.mode == ControlMode::AutoRun)),

            PinField::ActiveProfile => {
                PinValue::Int(model.selected_index().map_or(-1, |i| i as i64))
            }
            PinField::RunIndicator => {
                PinValue::Int(if run.phase == TimerPhase::Running { 255 } else { 0 })
            }

            // The stopped state keeps the wire's legacy −1 sentinel.
            PinField::TimeRemaining => {
                PinValue::Int(run.remaining().map_or(-1, |r| r.round() as i64))
            }
            PinField::TimeSeconds => {
                PinValue::Int(run.current_time().map_or(-1, |t| (t as i64) % 60))
            }
            PinField::TimeMinutes => {
                PinValue::Int(run.current_time().map_or(-1, |t| (t as i64) / 60))
            }

            PinField::EditProfile => {
                PinValue::Int(engine.edit_index().map_or(-1, |i| i as i64))
            }
            PinField::EditResolution => {
                PinValue::Int(settings.time_resolution_secs.round() as i64)
            }

            PinField::ChannelDisabled(ch) => {
                PinValue::Int(i64::from(!settings.channel_enabled(ch)))
            }
            PinField::NotifyMuted { mode, point } => {
                let muted = match (mode, point) {
                    (ControlMode::Manual, NotifyPoint::Half) => settings.manual_half_notify_muted,
                    (ControlMode::Manual, NotifyPoint::Full) => settings.manual_full_notify_muted,
                    (ControlMode::AutoRun, NotifyPoint::Half) => settings.auto_half_notify_muted,
                    (ControlMode::AutoRun, NotifyPoint::Full) => settings.auto_full_notify_muted,
                };
                PinValue::Int(i64::from(muted))
            }

            PinField::CpuTemperature => PinValue::Float(diag.cpu_temperature),
            PinField::CpuLoad => PinValue::Float(diag.cpu_load),

            PinField::Terminal(_) => entry.last_value.clone(),
        };

        Some((entry.is_integer, value))
    }
}

/// Host diagnostics mirrored on the reserved pin block. Fed by an
/// optional platform adapter; zeros when absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    pub cpu_temperature: f64,
    pub cpu_load: f64,
}
