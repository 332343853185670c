//! Port traits — the boundary between the station core and the outside
//! world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SyncDomain (core)
//! ```
//!
//! Driven adapters (actuator drivers, the display, the dashboard link,
//! the settings store) implement these traits. The core holds them as
//! `Option<Box<dyn …>>`: an absent collaborator is valid and makes the
//! affected operations no-ops — losing the dashboard must never stall
//! the profile ticker.
//!
//! Every call made while the core holds its lock must return promptly.
//! An adapter that talks to slow hardware or a network queues the work
//! and completes it on its own thread; a blocking implementation would
//! distort the timing of a physical process.

use crate::buttons::ButtonEvent;
use crate::config::OperatorSettings;
use crate::model::Channel;
use crate::pins::PinValue;

// ───────────────────────────────────────────────────────────────
// Actuator output (core → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the core commands actuators through this.
pub trait ActuatorOutput: Send {
    /// Drive one channel. `value` is already clamped to the channel's
    /// normalized range. Must be fire-and-forget.
    fn write(&mut self, channel: Channel, value: f64);

    /// Kill every output — called on shutdown.
    fn all_off(&mut self) {
        for channel in Channel::ALL {
            self.write(channel, 0.0);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Display (core → panel)
// ───────────────────────────────────────────────────────────────

/// The core only signals dirtiness; rendering happens elsewhere.
pub trait DisplaySurface: Send {
    fn request_redraw(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Remote dashboard link (core ↔ cloud)
// ───────────────────────────────────────────────────────────────

/// Outbound half of the dashboard protocol. The inbound half arrives as
/// calls into [`SyncDomain::handle_pin_write`](crate::sync::SyncDomain)
/// from the adapter's own receive thread.
pub trait RemoteLink: Send {
    /// Mirror a value onto a virtual pin.
    fn push(&mut self, pin: u8, value: &PinValue);

    /// Set presentation metadata on the widget bound to a pin (label
    /// lists, step sizes). Fire-and-forget; no acknowledgment.
    fn set_display_property(&mut self, pin: u8, key: &str, values: &[String]);

    /// Push a human-readable notification to the operator.
    fn notify(&mut self, message: &str);
}

// ───────────────────────────────────────────────────────────────
// Buttons (panel → core)
// ───────────────────────────────────────────────────────────────

/// Source of debounced, classified front-panel events. Polled by the
/// button pump actor; must never block.
pub trait ButtonSource: Send {
    fn poll(&mut self) -> Option<ButtonEvent>;
}

// ───────────────────────────────────────────────────────────────
// Settings persistence (core ↔ disk)
// ───────────────────────────────────────────────────────────────

/// Loads and persists operator settings across restarts.
pub trait SettingsStore: Send {
    /// Load persisted settings. `NotFound` on first boot.
    fn load(&self) -> Result<OperatorSettings, StoreError>;

    /// Persist settings atomically.
    fn save(&self, settings: &OperatorSettings) -> Result<(), StoreError>;
}

/// Errors from [`SettingsStore`] operations.
#[derive(Debug)]
pub enum StoreError {
    /// Nothing persisted yet.
    NotFound,
    /// Stored blob failed deserialization.
    Corrupted,
    /// Underlying I/O failed.
    Io(std::io::Error),
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "no settings stored"),
            Self::Corrupted => write!(f, "stored settings corrupted"),
            Self::Io(e) => write!(f, "settings I/O error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}
