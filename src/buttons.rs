//! Debounce + hold-repeat classification for the five-way keypad.
//!
//! The physical buttons are momentary switches sampled at tick rate. The
//! [`KeypadDecoder`] turns raw level samples into discrete events:
//!
//! | Gesture       | Condition                                | Event kind |
//! |---------------|------------------------------------------|------------|
//! | Press         | Level held through the debounce window   | `Press`    |
//! | Hold repeat   | Still held after the hold delay          | `Repeat`   |
//!
//! Repeats keep firing at a fixed pace while the key stays down, so a
//! held Up/Down scrolls the profile list and a held Left/Right scrubs
//! the preview cursor.

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// The five keys of the front-panel hat switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Select,
}

impl Key {
    pub const ALL: [Key; 5] = [Key::Up, Key::Down, Key::Left, Key::Right, Key::Select];
}

/// How the press was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    /// Initial debounced edge.
    Press,
    /// Auto-repeat while the key stays held.
    Repeat,
}

/// A classified keypad event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub key: Key,
    pub kind: PressKind,
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

const DEBOUNCE_MS: u32 = 50;
const HOLD_DELAY_MS: u32 = 1000;
const REPEAT_INTERVAL_MS: u32 = 250;

/// Per-key gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Idle,
    /// Level went high; waiting out contact bounce.
    DebounceWait { since_ms: u32 },
    /// Debounced press delivered; watching for hold.
    Held { since_ms: u32, last_repeat_ms: u32 },
}

/// Tick-driven decoder for the whole keypad.
pub struct KeypadDecoder {
    states: [Gesture; 5],
}

impl Default for KeypadDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeypadDecoder {
    pub fn new() -> Self {
        Self {
            states: [Gesture::Idle; 5],
        }
    }

    /// Advance the decoder by one sample tick.
    ///
    /// * `now_ms` — monotonic milliseconds.
    /// * `level` — raw sampled level per key (`true` = pressed).
    ///
    /// Returns every event classified on this tick (at most one per key).
    pub fn tick(
        &mut self,
        now_ms: u32,
        level: impl Fn(Key) -> bool,
    ) -> heapless::Vec<ButtonEvent, 5> {
        let mut events = heapless::Vec::new();

        for (i, key) in Key::ALL.into_iter().enumerate() {
            let down = level(key);
            let next = match self.states[i] {
                Gesture::Idle => {
                    if down {
                        Gesture::DebounceWait { since_ms: now_ms }
                    } else {
                        Gesture::Idle
                    }
                }

                Gesture::DebounceWait { since_ms } => {
                    if !down {
                        // Bounce or glitch shorter than the window.
                        Gesture::Idle
                    } else if now_ms.wrapping_sub(since_ms) >= DEBOUNCE_MS {
                        let _ = events.push(ButtonEvent {
                            key,
                            kind: PressKind::Press,
                        });
                        Gesture::Held {
                            since_ms: now_ms,
                            last_repeat_ms: now_ms,
                        }
                    } else {
                        Gesture::DebounceWait { since_ms }
                    }
                }

                Gesture::Held {
                    since_ms,
                    last_repeat_ms,
                } => {
                    if !down {
                        Gesture::Idle
                    } else if now_ms.wrapping_sub(since_ms) >= HOLD_DELAY_MS
                        && now_ms.wrapping_sub(last_repeat_ms) >= REPEAT_INTERVAL_MS
                    {
                        let _ = events.push(ButtonEvent {
                            key,
                            kind: PressKind::Repeat,
                        });
                        Gesture::Held {
                            since_ms,
                            last_repeat_ms: now_ms,
                        }
                    } else {
                        Gesture::Held {
                            since_ms,
                            last_repeat_ms,
                        }
                    }
                }
            };
            self.states[i] = next;
        }

        events
    }
}
