use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Literal token that makes the pod engage its emergency brakes.
pub const EMERGENCY_BRAKE: &str = "EMERGENCY_BRAKE";

/// A switchable pod subsystem. Each relay is addressed by one letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relay {
    BrakeRelease,
    LvEngage,
    Launchpad,
    Inverter,
    Contactor,
}

impl Relay {
    pub const ALL: [Relay; 5] = [
        Relay::BrakeRelease,
        Relay::LvEngage,
        Relay::Launchpad,
        Relay::Inverter,
        Relay::Contactor,
    ];

    /// The engage letter. Release is the same letter in lowercase.
    pub fn letter(self) -> char {
        match self {
            Relay::BrakeRelease => 'A',
            Relay::LvEngage => 'B',
            Relay::Launchpad => 'C',
            Relay::Inverter => 'D',
            Relay::Contactor => 'E',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Relay::BrakeRelease => "brake-release",
            Relay::LvEngage => "lv",
            Relay::Launchpad => "launchpad",
            Relay::Inverter => "inverter",
            Relay::Contactor => "contactor",
        }
    }
}

impl fmt::Display for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRelay(pub String);

impl fmt::Display for UnknownRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown relay '{}'", self.0)
    }
}

impl std::error::Error for UnknownRelay {}

impl FromStr for Relay {
    type Err = UnknownRelay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "brake-release" | "brakes" | "pod" | "a" => Ok(Relay::BrakeRelease),
            "lv" | "lv-engage" | "b" => Ok(Relay::LvEngage),
            "launchpad" | "c" => Ok(Relay::Launchpad),
            "inverter" | "d" => Ok(Relay::Inverter),
            "contactor" | "e" => Ok(Relay::Contactor),
            _ => Err(UnknownRelay(s.to_string())),
        }
    }
}

/// Direction of a relay command, carried on the wire as the letter's case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Polarity {
    Engage,
    Release,
}

impl Polarity {
    pub fn flipped(self) -> Self {
        match self {
            Polarity::Engage => Polarity::Release,
            Polarity::Release => Polarity::Engage,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Engage => f.write_str("engage"),
            Polarity::Release => f.write_str("release"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolarity(pub String);

impl fmt::Display for UnknownPolarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected engage/on or release/off, got '{}'", self.0)
    }
}

impl std::error::Error for UnknownPolarity {}

impl FromStr for Polarity {
    type Err = UnknownPolarity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "engage" | "on" | "start" => Ok(Polarity::Engage),
            "release" | "off" | "stop" => Ok(Polarity::Release),
            _ => Err(UnknownPolarity(s.to_string())),
        }
    }
}

/// A command written to the pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Relay { relay: Relay, polarity: Polarity },
    EmergencyBrake,
}

impl Command {
    pub fn relay(relay: Relay, polarity: Polarity) -> Self {
        Command::Relay { relay, polarity }
    }

    /// The command as written on the wire, newline terminated.
    pub fn wire(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Relay { relay, polarity } => {
                let letter = relay.letter();
                match polarity {
                    Polarity::Engage => write!(f, "{}", letter.to_ascii_uppercase()),
                    Polarity::Release => write!(f, "{}", letter.to_ascii_lowercase()),
                }
            }
            Command::EmergencyBrake => f.write_str(EMERGENCY_BRAKE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn polarity_is_encoded_in_letter_case() {
        assert_eq!(Command::relay(Relay::BrakeRelease, Polarity::Engage).wire(), "A\n");
        assert_eq!(Command::relay(Relay::BrakeRelease, Polarity::Release).wire(), "a\n");
        assert_eq!(Command::relay(Relay::Inverter, Polarity::Engage).wire(), "D\n");
        assert_eq!(Command::relay(Relay::Contactor, Polarity::Release).wire(), "e\n");
    }

    #[test]
    fn emergency_brake_token() {
        assert_eq!(Command::EmergencyBrake.wire(), "EMERGENCY_BRAKE\n");
    }

    #[test]
    fn every_relay_has_a_distinct_letter() {
        let letters: BTreeSet<char> = Relay::ALL.iter().map(|r| r.letter()).collect();

        assert_eq!(letters.len(), Relay::ALL.len());
    }

    #[test]
    fn parse_relay_names() {
        assert_eq!("launchpad".parse(), Ok(Relay::Launchpad));
        assert_eq!("LV".parse(), Ok(Relay::LvEngage));
        assert_eq!("pod".parse(), Ok(Relay::BrakeRelease));
        assert!("warp-drive".parse::<Relay>().is_err());
    }

    #[test]
    fn parse_polarity() {
        assert_eq!("on".parse(), Ok(Polarity::Engage));
        assert_eq!("Release".parse(), Ok(Polarity::Release));
        assert!("maybe".parse::<Polarity>().is_err());
        assert_eq!(Polarity::Engage.flipped(), Polarity::Release);
    }
}
