use crate::{
    display::DisplaySurface,
    panel::{OperatorCommand, Panel},
    time::TimeProvider,
};
use log::{debug, error, info, warn};
use relay_controller::{Command, RelayController};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use telemetry::{Event, SafetyTrigger, Session};
use tokio::{
    select,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::{MissedTickBehavior, interval, sleep},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disconnected => f.write_str("Disconnected"),
            LinkState::Connected => f.write_str("Connected"),
        }
    }
}

/// One connection to the pod: telemetry in, relay commands out.
pub struct Station<C, D, T>
where
    C: RelayController,
    D: DisplaySurface,
    T: TimeProvider,
{
    session: Session,
    controller: C,
    display: D,
    panel: Panel,
    link: LinkState,
    clock: T,
    tick: Duration,
}

impl<C, D, T> Station<C, D, T>
where
    C: RelayController,
    D: DisplaySurface,
    T: TimeProvider,
{
    pub fn new(session: Session, controller: C, display: D, clock: T, tick: Duration) -> Self {
        Self {
            session,
            controller,
            display,
            panel: Panel::new(),
            link: LinkState::Disconnected,
            clock,
            tick,
        }
    }

    /// Runs until the serial stream ends or `stop` is set, then returns the
    /// final link state.
    ///
    /// Each chunk is decoded and acted upon in full before the next one is
    /// awaited. Liveness is evaluated on every tick, operator commands are
    /// applied as they arrive and delayed brakes fire once their timer runs
    /// out.
    pub async fn run(
        &mut self,
        mut chunks: UnboundedReceiver<String>,
        mut operator: UnboundedReceiver<OperatorCommand>,
        stop: Arc<AtomicBool>,
    ) -> LinkState {
        let (delayed_tx, mut delayed_rx) = mpsc::unbounded_channel();
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut operator_open = true;

        self.set_link(LinkState::Connected);

        loop {
            if stop.load(Ordering::Relaxed) {
                info!("[STATION] Stopping");
                break;
            }

            select! {
                chunk = chunks.recv() => match chunk {
                    Some(chunk) => {
                        let events = self.session.ingest(&chunk, self.clock.now());
                        self.apply(events, &delayed_tx);
                    }
                    None => {
                        warn!("[STATION] Serial link closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    let events = self.session.tick(self.clock.now());
                    self.apply(events, &delayed_tx);
                }
                command = operator.recv(), if operator_open => match command {
                    Some(command) => {
                        if !self.operate(command) {
                            stop.store(true, Ordering::Relaxed);
                        }
                    }
                    None => operator_open = false,
                },
                Some(trigger) = delayed_rx.recv() => {
                    self.emergency_brake(trigger);
                }
            }
        }

        self.set_link(LinkState::Disconnected);
        self.link
    }

    fn apply(&mut self, events: Vec<Event>, delayed: &UnboundedSender<SafetyTrigger>) {
        for event in events {
            match event {
                Event::Display { slot, text } => self.display.show(&slot, &text),
                Event::Alert(message) => self.display.alert(&message),
                Event::Safety(trigger) => self.emergency_brake(trigger),
                Event::DelayedSafety { delay, trigger } => {
                    info!("[SAFETY] Brakes in {:?}: {}", delay, trigger);
                    schedule_brake(delay, trigger, delayed.clone());
                }
            }
        }
    }

    /// Handles one operator command. Returns `false` when the operator asked
    /// to quit.
    fn operate(&mut self, command: OperatorCommand) -> bool {
        match command {
            OperatorCommand::Toggle(relay) => {
                let command = self.panel.toggle(relay);
                self.send(&command);
            }
            OperatorCommand::Set(relay, polarity) => {
                let command = self.panel.set(relay, polarity);
                self.send(&command);
            }
            OperatorCommand::Brake => self.emergency_brake("operator request"),
            OperatorCommand::Status => {
                self.display.report();
                let active: Vec<String> = self.panel.active().map(|r| r.to_string()).collect();
                info!(
                    "[STATUS] Link {}, active relays [{}], {} frames recorded, {} dropped",
                    self.link,
                    active.join(", "),
                    self.session.history().len(),
                    self.session.dropped_frames()
                );
            }
            OperatorCommand::Quit => return false,
        }

        true
    }

    /// Writes the emergency brake command. Only when the write succeeds is
    /// the brake confirmed and every active relay toggle released.
    pub fn emergency_brake(&mut self, reason: impl fmt::Display) {
        warn!("[SAFETY] Engaging emergency brakes: {}", reason);

        match self.controller.send(&Command::EmergencyBrake) {
            Ok(()) => {
                self.display.brake_confirmed();

                for command in self.panel.converge() {
                    self.send(&command);
                }
            }
            Err(e) => error!("[SAFETY] Failed to engage emergency brakes: {}", e),
        }
    }

    fn send(&mut self, command: &Command) {
        match self.controller.send(command) {
            Ok(()) => debug!("[STATION] Sent {}", command),
            Err(e) => error!("[STATION] Failed to send {}: {}", command, e),
        }
    }

    fn set_link(&mut self, link: LinkState) {
        if self.link != link {
            self.link = link;
            self.display.link_changed(link);
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn link(&self) -> LinkState {
        self.link
    }
}

fn schedule_brake(delay: Duration, trigger: SafetyTrigger, tx: UnboundedSender<SafetyTrigger>) {
    tokio::spawn(async move {
        sleep(delay).await;

        if tx.send(trigger).is_err() {
            debug!("[SAFETY] Link closed before delayed brake: {}", trigger);
        }
    });
}
