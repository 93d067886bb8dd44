use crate::station::LinkState;
use log::{info, warn};
use std::collections::HashMap;
use telemetry::Slot;

/// Where the station writes what it learns from the pod.
pub trait DisplaySurface {
    fn show(&mut self, slot: &Slot, text: &str);
    fn alert(&mut self, message: &str);
    fn brake_confirmed(&mut self);
    fn link_changed(&mut self, state: LinkState);
    /// Print everything currently on display.
    fn report(&self) {}
}

/// Display surface that logs each slot whenever its text changes.
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    values: HashMap<Slot, String>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, slot: &Slot) -> Option<&str> {
        self.values.get(slot).map(String::as_str)
    }
}

impl DisplaySurface for TerminalDisplay {
    fn show(&mut self, slot: &Slot, text: &str) {
        if self.value(slot) == Some(text) {
            return;
        }

        info!("[DISPLAY] {:<20} {}", slot.id(), text);
        self.values.insert(*slot, text.to_string());
    }

    fn alert(&mut self, message: &str) {
        for line in message.lines() {
            warn!("[ALERT] {}", line);
        }
    }

    fn brake_confirmed(&mut self) {
        warn!("[DISPLAY] Emergency brakes engaged");
        self.values.insert(Slot::EmergencyBrake, "Engaged".to_string());
    }

    fn link_changed(&mut self, state: LinkState) {
        info!("[DISPLAY] Link {}", state);
    }

    fn report(&self) {
        let mut values: Vec<(String, &str)> = self
            .values
            .iter()
            .map(|(slot, text)| (slot.id(), text.as_str()))
            .collect();
        values.sort();

        for (id, text) in values {
            info!("[STATUS] {:<20} {}", id, text);
        }
    }
}
