//! Unified error types for the station core.
//!
//! A single `ControlError` enum that every core operation funnels into,
//! keeping error handling at the actor entry points uniform. All variants
//! are `Copy` so they can be cheaply passed across the lock boundary
//! without allocation. No error in this taxonomy is fatal: each one is
//! recovered at the operation boundary that raised it.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level control error
// ---------------------------------------------------------------------------

/// Every fallible core operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// A profile index outside the library bounds was requested.
    /// Surfaced to the caller; no state change.
    OutOfRange { index: i64, len: usize },
    /// A direct actuator adjustment was attempted while in auto-run mode.
    /// Surfaced, and the authoritative value is re-pushed to the remote
    /// collaborator to correct any optimistic dashboard update.
    WrongMode,
    /// An inbound pin write carried a payload that does not decode to the
    /// pin's bound type. Logged and dropped; the write never reaches a
    /// handler.
    BadValue(&'static str),
    /// A timer start was requested with no profile selected.
    /// The request is a no-op at the call boundary.
    NoConfiguration,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { index, len } => {
                write!(f, "profile index {} out of range (library holds {})", index, len)
            }
            Self::WrongMode => write!(f, "direct adjustment rejected: not in manual mode"),
            Self::BadValue(msg) => write!(f, "undecodable pin value: {}", msg),
            Self::NoConfiguration => write!(f, "no profile selected"),
        }
    }
}

impl std::error::Error for ControlError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, ControlError>;
