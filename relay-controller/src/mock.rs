use crate::{Command, RelayController};
use log::info;
use std::{
    fmt,
    sync::{Arc, Mutex},
};

/// Records commands instead of writing them anywhere. Used for dry runs and
/// tests; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MockController {
    sent: Arc<Mutex<Vec<Command>>>,
    failing: bool,
}

#[derive(Debug)]
pub struct MockControllerError;

impl fmt::Display for MockControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock link is down")
    }
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    /// A controller whose every `send` fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Commands sent so far, oldest first.
    pub fn sent(&self) -> Vec<Command> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl RelayController for MockController {
    type Error = MockControllerError;

    fn send(&mut self, command: &Command) -> Result<(), Self::Error> {
        if self.failing {
            return Err(MockControllerError);
        }

        info!("[MOCK] {}", command);

        self.sent
            .lock()
            .map_err(|_| MockControllerError)?
            .push(*command);

        Ok(())
    }
}
