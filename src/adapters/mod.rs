//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter          | Implements      | Connects to                |
//! |------------------|-----------------|----------------------------|
//! | `profile_store`  | —               | JSON profile folder        |
//! | `settings_store` | SettingsStore   | Binary settings file       |
//! | `log_sink`       | ActuatorOutput  | Process logger             |
//! |                  | DisplaySurface  |                            |
//! |                  | RemoteLink      |                            |
//!
//! Real deployments add GPIO/PWM and dashboard-transport adapters behind
//! the same traits; the core never knows the difference.

pub mod log_sink;
pub mod profile_store;
pub mod settings_store;
