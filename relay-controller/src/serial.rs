use crate::{Command, RelayController};
use log::debug;
use serialport::SerialPort;
use std::{
    fmt,
    io::{self, Write},
    time::Duration,
};

#[derive(Debug)]
pub enum SerialRelayControllerError {
    OpenError(serialport::Error),
    CloneError(serialport::Error),
    WriteError(io::Error),
}

impl fmt::Display for SerialRelayControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenError(e) => write!(f, "Failed to open serial port: {}", e),
            Self::CloneError(e) => write!(f, "Failed to clone serial port handle: {}", e),
            Self::WriteError(e) => write!(f, "Failed to write to serial port: {}", e),
        }
    }
}

impl std::error::Error for SerialRelayControllerError {}

/// A controller for the pod relays, writing commands to a serial port.
pub struct SerialRelayController {
    pub port: Box<dyn SerialPort>,
}

impl SerialRelayController {
    /// Opens `port_name` at `baud_rate`. `timeout` bounds every read and write.
    pub fn new(
        port_name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self, SerialRelayControllerError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(SerialRelayControllerError::OpenError)?;

        Ok(Self { port })
    }

    /// A second handle to the same port, for the telemetry reader.
    pub fn reader(&self) -> Result<Box<dyn SerialPort>, SerialRelayControllerError> {
        self.port
            .try_clone()
            .map_err(SerialRelayControllerError::CloneError)
    }
}

impl RelayController for SerialRelayController {
    type Error = SerialRelayControllerError;

    fn send(&mut self, command: &Command) -> Result<(), Self::Error> {
        debug!("[SERIAL] Writing {}", command);

        self.port
            .write_all(command.wire().as_bytes())
            .and_then(|_| self.port.flush())
            .map_err(SerialRelayControllerError::WriteError)
    }
}
