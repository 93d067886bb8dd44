pub mod command;
pub mod mock;
pub mod serial;

pub use command::{Command, EMERGENCY_BRAKE, Polarity, Relay};

use std::fmt;

/// A sink for commands addressed to the pod.
///
/// Commands are fire-and-forget: nothing is read back, and a successful
/// `send` only means the bytes were handed to the transport.
pub trait RelayController {
    type Error: fmt::Debug + fmt::Display;

    /// Sends a single command to the pod.
    fn send(&mut self, command: &Command) -> Result<(), Self::Error>;
}
