//! Log-backed port adapters.
//!
//! Implement the collaborator traits by writing every call to the
//! process logger. Used by the binary when no hardware or dashboard
//! transport is configured, and handy for soak-testing the core on a
//! workstation.

use log::{debug, info};

use crate::model::Channel;
use crate::pins::PinValue;
use crate::ports::{ActuatorOutput, DisplaySurface, RemoteLink};

/// Actuator adapter that logs every write.
pub struct LogActuator;

impl ActuatorOutput for LogActuator {
    fn write(&mut self, channel: Channel, value: f64) {
        debug!("ACT  | {} = {:.3}", channel, value);
    }

    fn all_off(&mut self) {
        info!("ACT  | all off");
        for channel in Channel::ALL {
            self.write(channel, 0.0);
        }
    }
}

/// Display adapter that only counts dirtiness.
pub struct LogDisplay;

impl DisplaySurface for LogDisplay {
    fn request_redraw(&mut self) {
        debug!("DISP | redraw requested");
    }
}

/// Dashboard link adapter that logs the outbound half of the protocol.
pub struct LogRemoteLink;

impl RemoteLink for LogRemoteLink {
    fn push(&mut self, pin: u8, value: &PinValue) {
        debug!("PIN  | V{} <- {}", pin, value);
    }

    fn set_display_property(&mut self, pin: u8, key: &str, values: &[String]) {
        debug!("PROP | V{} {} = {:?}", pin, key, values);
    }

    fn notify(&mut self, message: &str) {
        info!("NOTE | {}", message);
    }
}
