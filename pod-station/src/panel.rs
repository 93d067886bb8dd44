use log::{info, warn};
use relay_controller::{
    Command, Polarity, Relay,
    command::{UnknownPolarity, UnknownRelay},
};
use std::{collections::BTreeSet, fmt, io::BufRead, str::FromStr, thread};
use tokio::sync::mpsc::UnboundedSender;

/// A request typed by the operator on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Flip a relay's toggle, e.g. `lv`.
    Toggle(Relay),
    /// Drive a relay to a given state, e.g. `inverter release`.
    Set(Relay, Polarity),
    Brake,
    Status,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum OperatorCommandError {
    Empty,
    UnknownRelay(UnknownRelay),
    UnknownPolarity(UnknownPolarity),
    TrailingInput(String),
}

impl fmt::Display for OperatorCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorCommandError::Empty => write!(f, "Empty command"),
            OperatorCommandError::UnknownRelay(e) => write!(f, "{}", e),
            OperatorCommandError::UnknownPolarity(e) => write!(f, "{}", e),
            OperatorCommandError::TrailingInput(rest) => {
                write!(f, "Unexpected input after command: {}", rest)
            }
        }
    }
}

impl std::error::Error for OperatorCommandError {}

impl FromStr for OperatorCommand {
    type Err = OperatorCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();

        let first = words.next().ok_or(OperatorCommandError::Empty)?;
        let command = match first.to_ascii_lowercase().as_str() {
            "brake" | "emergency" => OperatorCommand::Brake,
            "status" => OperatorCommand::Status,
            "quit" | "exit" => OperatorCommand::Quit,
            _ => {
                let relay = first.parse().map_err(OperatorCommandError::UnknownRelay)?;

                match words.next() {
                    Some(word) => OperatorCommand::Set(
                        relay,
                        word.parse().map_err(OperatorCommandError::UnknownPolarity)?,
                    ),
                    None => OperatorCommand::Toggle(relay),
                }
            }
        };

        let rest: Vec<&str> = words.collect();
        if !rest.is_empty() {
            return Err(OperatorCommandError::TrailingInput(rest.join(" ")));
        }

        Ok(command)
    }
}

/// The operator's relay toggles. A relay is active once engaged from the
/// panel and until it is released again.
#[derive(Debug, Default)]
pub struct Panel {
    active: BTreeSet<Relay>,
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, relay: Relay) -> bool {
        self.active.contains(&relay)
    }

    pub fn active(&self) -> impl Iterator<Item = Relay> + '_ {
        self.active.iter().copied()
    }

    pub fn toggle(&mut self, relay: Relay) -> Command {
        let polarity = if self.is_active(relay) {
            Polarity::Release
        } else {
            Polarity::Engage
        };

        self.set(relay, polarity)
    }

    pub fn set(&mut self, relay: Relay, polarity: Polarity) -> Command {
        match polarity {
            Polarity::Engage => self.active.insert(relay),
            Polarity::Release => self.active.remove(&relay),
        };

        Command::relay(relay, polarity)
    }

    /// Returns every active toggle to its released state, yielding the
    /// commands that do so.
    pub fn converge(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.active)
            .into_iter()
            .map(|relay| Command::relay(relay, Polarity::Release))
            .collect()
    }
}

/// Reads operator commands from stdin on a plain thread.
///
/// Stdin has no cancellable read, so the thread is left detached and ends
/// with the process, after `quit`, or once the station stops listening.
pub fn spawn_console(tx: UnboundedSender<OperatorCommand>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        info!("[CONSOLE] Commands: <relay> [engage|release], brake, status, quit");
        info!(
            "[CONSOLE] Relays: {}",
            Relay::ALL.map(|r| r.name()).join(", ")
        );

        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("[CONSOLE] Failed to read stdin: {}", e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<OperatorCommand>() {
                Ok(command) => {
                    if tx.send(command).is_err() || command == OperatorCommand::Quit {
                        break;
                    }
                }
                Err(e) => warn!("[CONSOLE] {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operator_commands() {
        assert_eq!("brake".parse(), Ok(OperatorCommand::Brake));
        assert_eq!(" STATUS ".parse(), Ok(OperatorCommand::Status));
        assert_eq!("lv".parse(), Ok(OperatorCommand::Toggle(Relay::LvEngage)));
        assert_eq!(
            "inverter release".parse(),
            Ok(OperatorCommand::Set(Relay::Inverter, Polarity::Release))
        );
    }

    #[test]
    fn rejects_bad_commands() {
        assert_eq!("".parse::<OperatorCommand>(), Err(OperatorCommandError::Empty));
        assert!(matches!(
            "warp".parse::<OperatorCommand>(),
            Err(OperatorCommandError::UnknownRelay(_))
        ));
        assert!(matches!(
            "lv sideways".parse::<OperatorCommand>(),
            Err(OperatorCommandError::UnknownPolarity(_))
        ));
        assert!(matches!(
            "lv on now".parse::<OperatorCommand>(),
            Err(OperatorCommandError::TrailingInput(_))
        ));
    }

    #[test]
    fn toggle_alternates_engage_and_release() {
        let mut panel = Panel::new();

        let first = panel.toggle(Relay::Launchpad);
        let second = panel.toggle(Relay::Launchpad);

        assert_eq!(first.to_string(), "C");
        assert_eq!(second.to_string(), "c");
        assert!(!panel.is_active(Relay::Launchpad));
    }

    #[test]
    fn converge_releases_only_active_toggles() {
        let mut panel = Panel::new();
        panel.toggle(Relay::BrakeRelease);
        panel.toggle(Relay::Inverter);
        panel.toggle(Relay::LvEngage);
        panel.toggle(Relay::LvEngage);

        let commands = panel.converge();

        assert_eq!(
            commands,
            vec![
                Command::relay(Relay::BrakeRelease, Polarity::Release),
                Command::relay(Relay::Inverter, Polarity::Release),
            ]
        );
        assert_eq!(panel.active().count(), 0);
        assert!(panel.converge().is_empty());
    }
}
