//! Actor runtime: one thread per periodic execution context.
//!
//! Each actor is a plain OS thread that sleeps until its next deadline
//! and funnels every mutation through the synchronization domain. The
//! only suspension points are between ticks — never while holding the
//! lock — and every loop observes the shared shutdown flag.
//!
//! The fourth actor (the inbound remote-write dispatcher) has no thread
//! here: the link adapter owns its receive thread and calls
//! [`SyncDomain::handle_pin_write`] directly.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::StationConfig;
use crate::ports::ButtonSource;
use crate::sync::SyncDomain;

/// Button source poll period — fast enough that the debounce window in
/// the keypad decoder dominates latency.
const BUTTON_POLL: Duration = Duration::from_millis(10);

/// Join handles for every spawned actor.
pub struct ActorHandles {
    handles: Vec<thread::JoinHandle<()>>,
}

impl ActorHandles {
    /// Wait for every actor to observe shutdown and exit.
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                log::error!("actor thread panicked");
            }
        }
    }
}

/// Spawn the periodic actors. The button pump is only started when a
/// source is attached.
pub fn spawn_all(
    domain: &SyncDomain,
    config: &StationConfig,
    buttons: Option<Box<dyn ButtonSource>>,
) -> io::Result<ActorHandles> {
    let mut handles = Vec::new();

    handles.push(spawn_profile_ticker(
        domain.clone(),
        Duration::from_secs_f64(config.profile_tick_secs()),
    )?);
    handles.push(spawn_remote_ticker(
        domain.clone(),
        Duration::from_secs_f64(config.remote_tick_secs()),
    )?);
    if let Some(source) = buttons {
        handles.push(spawn_button_pump(domain.clone(), source)?);
    }

    Ok(ActorHandles { handles })
}

/// The fixed-rate profile ticker: advances elapsed time and writes
/// actuators.
pub fn spawn_profile_ticker(
    domain: SyncDomain,
    period: Duration,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("profile-tick".to_string())
        .spawn(move || {
            let dt = period.as_secs_f64();
            let mut next = Instant::now() + period;
            while !domain.shutdown_pending() {
                domain.profile_tick(dt);
                sleep_until(&mut next, period);
            }
            log::debug!("profile ticker stopped");
        })
}

/// The lower-rate remote mirror ticker.
pub fn spawn_remote_ticker(
    domain: SyncDomain,
    period: Duration,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("remote-tick".to_string())
        .spawn(move || {
            let mut next = Instant::now() + period;
            while !domain.shutdown_pending() {
                domain.remote_tick();
                sleep_until(&mut next, period);
            }
            log::debug!("remote ticker stopped");
        })
}

/// The button pump: polls the source and forwards classified events.
pub fn spawn_button_pump(
    domain: SyncDomain,
    mut source: Box<dyn ButtonSource>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("button-pump".to_string())
        .spawn(move || {
            let mut next = Instant::now() + BUTTON_POLL;
            while !domain.shutdown_pending() {
                domain.pump_buttons(source.as_mut());
                sleep_until(&mut next, BUTTON_POLL);
            }
            log::debug!("button pump stopped");
        })
}

/// Sleep to the next deadline, then advance it by one period.
/// After an overrun the schedule re-anchors to now instead of firing a
/// burst of catch-up ticks — a late tick must not distort playback
/// timing further.
fn sleep_until(next: &mut Instant, period: Duration) {
    let now = Instant::now();
    if *next > now {
        thread::sleep(*next - now);
    }
    *next += period;
    let now = Instant::now();
    if *next < now {
        *next = now + period;
    }
}
