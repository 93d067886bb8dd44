use relay_controller::serial::SerialRelayControllerError;
use std::{fmt, io};

#[derive(Debug)]
pub enum StationError {
    Config(config::ConfigError),
    Serial(SerialRelayControllerError),
    Replay(io::Error),
    Task(tokio::task::JoinError),
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationError::Config(e) => write!(f, "Failed to load configuration: {}", e),
            StationError::Serial(e) => write!(f, "{}", e),
            StationError::Replay(e) => write!(f, "Failed to read recording: {}", e),
            StationError::Task(e) => write!(f, "Serial reader failed: {}", e),
        }
    }
}

impl std::error::Error for StationError {}

impl From<config::ConfigError> for StationError {
    fn from(e: config::ConfigError) -> Self {
        StationError::Config(e)
    }
}

impl From<SerialRelayControllerError> for StationError {
    fn from(e: SerialRelayControllerError) -> Self {
        StationError::Serial(e)
    }
}

impl From<tokio::task::JoinError> for StationError {
    fn from(e: tokio::task::JoinError) -> Self {
        StationError::Task(e)
    }
}
