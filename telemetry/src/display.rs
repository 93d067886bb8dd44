use crate::liveness::Node;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// A named place on the operator display that telemetry is written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    MotorTemperature,
    Speed,
    InverterVoltage,
    LvsVoltage,
    ContactorVoltage,
    MlxTemperature,
    DsTemperature,
    ObjectTemperature,
    AmbientTemperature,
    Orientation(Axis),
    /// Link state as judged by the liveness tick.
    NodeStatus(Node),
    /// Status the node itself reported in its last frame.
    NodeReported(Node),
    NodeLastSeen(Node),
    Battery(Node),
    EmergencyBrake,
}

impl Slot {
    pub fn id(&self) -> String {
        match self {
            Slot::MotorTemperature => "motor-temp".to_string(),
            Slot::Speed => "speed-value".to_string(),
            Slot::InverterVoltage => "Inverter-voltage".to_string(),
            Slot::LvsVoltage => "LVS-voltage".to_string(),
            Slot::ContactorVoltage => "Contacter-voltage".to_string(),
            Slot::MlxTemperature => "mlx-temp".to_string(),
            Slot::DsTemperature => "ds-temp".to_string(),
            Slot::ObjectTemperature => "object-temp".to_string(),
            Slot::AmbientTemperature => "ambient-temp".to_string(),
            Slot::Orientation(Axis::X) => "orientation-x".to_string(),
            Slot::Orientation(Axis::Y) => "orientation-y".to_string(),
            Slot::Orientation(Axis::Z) => "orientation-z".to_string(),
            Slot::NodeStatus(node) => format!("esp-status-{}", node),
            Slot::NodeReported(node) => format!("esp-reported-{}", node),
            Slot::NodeLastSeen(node) => format!("esp-last-seen-{}", node),
            Slot::Battery(node) => format!("esp-battery-{}", node),
            Slot::EmergencyBrake => "emergencyBrake".to_string(),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Which display slot each of `VB1`, `VB2`, `VB3` is shown in.
///
/// Two firmware revisions disagree on the first two channels, so the layout
/// is chosen explicitly rather than assumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoltageLayout {
    /// VB1 inverter, VB2 LVS, VB3 contactor.
    #[default]
    InverterFirst,
    /// VB1 LVS, VB2 inverter, VB3 contactor.
    LvsFirst,
}

impl VoltageLayout {
    pub fn slots(self) -> [Slot; 3] {
        match self {
            VoltageLayout::InverterFirst => [
                Slot::InverterVoltage,
                Slot::LvsVoltage,
                Slot::ContactorVoltage,
            ],
            VoltageLayout::LvsFirst => [
                Slot::LvsVoltage,
                Slot::InverterVoltage,
                Slot::ContactorVoltage,
            ],
        }
    }
}
