//! Station configuration parameters
//!
//! All tunable parameters for the wash/cure station, split into two
//! lifetimes: [`StationConfig`] is fixed at startup (tick rates, step
//! sizes, paths), while [`OperatorSettings`] is runtime-mutable from the
//! dashboard settings pins and persisted across restarts.

use serde::{Deserialize, Serialize};

use crate::model::Channel;

/// Fixed startup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    // --- Timing ---
    /// Profile playback tick rate (Hz). Advances elapsed time and writes
    /// actuators.
    pub profile_tick_hz: u32,
    /// Remote mirror tick rate (Hz). Pushes state snapshots outward.
    pub remote_tick_hz: u32,
    /// Full-state resync period, in remote ticks. Only runs while the
    /// timer is stopped.
    pub resync_interval_ticks: u64,
    /// Seconds after the last settings change before an auto-save.
    pub settings_autosave_secs: f64,

    // --- Manual adjustment ---
    /// Per-press increment for the vertical axis (normalized units).
    pub axis_step: f64,
    /// Per-press increment for the fan.
    pub fan_step: f64,
    /// Per-press increment for the UV light.
    pub light_step: f64,

    // --- Notifications ---
    /// Window before profile end inside which the completion
    /// notification fires (seconds).
    pub full_notify_window_secs: f64,

    // --- Paths ---
    /// Folder scanned for `*.cfg` profile files at startup.
    pub profile_dir: String,
}

impl StationConfig {
    /// Duration of one profile tick in seconds.
    pub fn profile_tick_secs(&self) -> f64 {
        1.0 / f64::from(self.profile_tick_hz)
    }

    /// Duration of one remote tick in seconds.
    pub fn remote_tick_secs(&self) -> f64 {
        1.0 / f64::from(self.remote_tick_hz)
    }

    /// Manual increment step for a channel.
    pub fn step_for(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Axis => self.axis_step,
            Channel::Fan => self.fan_step,
            Channel::Light => self.light_step,
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            profile_tick_hz: 30,
            remote_tick_hz: 10,
            resync_interval_ticks: 100, // 10 s at 10 Hz
            settings_autosave_secs: 5.0,

            axis_step: 0.05,
            fan_step: 0.05,
            light_step: 0.05,

            full_notify_window_secs: 1.0,

            profile_dir: "profiles".to_string(),
        }
    }
}

/// Operator-tunable settings, mutated from the dashboard settings pins
/// and persisted via [`SettingsStore`](crate::ports::SettingsStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSettings {
    /// Channel enables. A disabled channel is excluded from playback and
    /// actuator writes — lets an operator park a malfunctioning axis
    /// without editing the profile.
    pub axis_enabled: bool,
    pub fan_enabled: bool,
    pub light_enabled: bool,

    /// Half/full completion notification mutes, one pair per control mode.
    pub manual_half_notify_muted: bool,
    pub manual_full_notify_muted: bool,
    pub auto_half_notify_muted: bool,
    pub auto_full_notify_muted: bool,

    /// Preview graph time resolution (seconds per grid division).
    pub time_resolution_secs: f64,
}

/// Bounds for [`OperatorSettings::time_resolution_secs`].
pub const TIME_RESOLUTION_MIN: f64 = 5.0;
pub const TIME_RESOLUTION_MAX: f64 = 60.0;
/// Per-press resolution adjustment step.
pub const TIME_RESOLUTION_STEP: f64 = 5.0;

impl OperatorSettings {
    /// Whether a channel participates in playback and actuator writes.
    pub fn channel_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Axis => self.axis_enabled,
            Channel::Fan => self.fan_enabled,
            Channel::Light => self.light_enabled,
        }
    }

    pub fn set_channel_enabled(&mut self, channel: Channel, enabled: bool) {
        match channel {
            Channel::Axis => self.axis_enabled = enabled,
            Channel::Fan => self.fan_enabled = enabled,
            Channel::Light => self.light_enabled = enabled,
        }
    }
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            axis_enabled: true,
            fan_enabled: true,
            light_enabled: true,

            manual_half_notify_muted: false,
            manual_full_notify_muted: false,
            auto_half_notify_muted: false,
            auto_full_notify_muted: false,

            time_resolution_secs: 30.0,
        }
    }
}
