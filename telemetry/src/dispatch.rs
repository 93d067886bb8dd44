use crate::{
    display::{Axis, Slot, VoltageLayout},
    frame::{Reading, TelemetryFrame, raw_text},
    liveness::{Liveness, Node},
};
use chrono::{DateTime, Utc};
use log::warn;
use std::{fmt, time::Duration};

/// Temperatures strictly above this engage the emergency brakes.
pub const CRITICAL_TEMPERATURE: f64 = 120.0;
/// A `dsTemperature` of exactly this value brakes after [`SENTINEL_DELAY`].
pub const SENTINEL_TEMPERATURE: f64 = 95.0;
pub const SENTINEL_DELAY: Duration = Duration::from_secs(5);

/// Why the station asks for the emergency brakes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SafetyTrigger {
    MotorTemperature(f64),
    MlxTemperature(f64),
    DsTemperature(f64),
    ObjectTemperature(f64),
    DsSentinel(f64),
}

impl SafetyTrigger {
    pub fn temperature(self) -> f64 {
        match self {
            SafetyTrigger::MotorTemperature(t)
            | SafetyTrigger::MlxTemperature(t)
            | SafetyTrigger::DsTemperature(t)
            | SafetyTrigger::ObjectTemperature(t)
            | SafetyTrigger::DsSentinel(t) => t,
        }
    }
}

impl fmt::Display for SafetyTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyTrigger::MotorTemperature(t) => write!(f, "motor temperature {}°C", t),
            SafetyTrigger::MlxTemperature(t) => write!(f, "MLX temperature {}°C", t),
            SafetyTrigger::DsTemperature(t) => write!(f, "DS temperature {}°C", t),
            SafetyTrigger::ObjectTemperature(t) => write!(f, "object temperature {}°C", t),
            SafetyTrigger::DsSentinel(t) => write!(f, "DS sentinel reading {}°C", t),
        }
    }
}

/// Something the station must act upon after a frame or a liveness tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Write `text` into a display slot.
    Display { slot: Slot, text: String },
    /// Tell the operator something went wrong.
    Alert(String),
    /// Engage the emergency brakes now.
    Safety(SafetyTrigger),
    /// Engage the emergency brakes once `delay` has passed.
    DelayedSafety {
        delay: Duration,
        trigger: SafetyTrigger,
    },
}

impl Event {
    fn display(slot: Slot, text: impl Into<String>) -> Self {
        Event::Display {
            slot,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    pub critical_temperature: f64,
    pub sentinel_temperature: f64,
    pub sentinel_delay: Duration,
    pub voltage_layout: VoltageLayout,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            critical_temperature: CRITICAL_TEMPERATURE,
            sentinel_temperature: SENTINEL_TEMPERATURE,
            sentinel_delay: SENTINEL_DELAY,
            voltage_layout: VoltageLayout::default(),
        }
    }
}

/// Applies every handler whose fields are present in a frame.
///
/// Field groups are independent: a frame may update several slots and
/// request the brakes at the same time. A frame requests the brakes at most
/// once, naming the first field that crossed the threshold.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn dispatch(
        &self,
        frame: &TelemetryFrame,
        liveness: &mut Liveness,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let critical = self.config.critical_temperature;
        let mut events = Vec::new();
        let mut safety = None;

        // Read before this frame refreshes it.
        let parent_alive = liveness.is_alive(Node::Parent, now);

        if let Some(temp) = reading(&frame.temperature, "temperature") {
            events.push(Event::display(
                Slot::MotorTemperature,
                format!("{:.1}°C", temp),
            ));
            if temp > critical {
                safety.get_or_insert(SafetyTrigger::MotorTemperature(temp));
            }
        }

        if let Some(peak) = frame.accel.as_deref().and_then(peak_magnitude) {
            events.push(Event::display(
                Slot::Speed,
                format!("{:.2} m/s", speed_from_acceleration(peak)),
            ));
        }

        if let Some(values) = frame.voltages() {
            for (slot, value) in self.config.voltage_layout.slots().into_iter().zip(values) {
                events.push(Event::display(slot, format!("{}V", raw_text(value))));
            }
        }

        if let Some(temp) = reading(&frame.mlx_temperature, "mlxTemperature") {
            events.push(Event::display(Slot::MlxTemperature, format!("{:.1}°C", temp)));
            if temp > critical {
                safety.get_or_insert(SafetyTrigger::MlxTemperature(temp));
            }
        }

        if let Some(temp) = reading(&frame.ds_temperature, "dsTemperature") {
            events.push(Event::display(Slot::DsTemperature, format!("{:.1}°C", temp)));
            if temp > critical {
                safety.get_or_insert(SafetyTrigger::DsTemperature(temp));
            }
            if parent_alive && temp == self.config.sentinel_temperature {
                events.push(Event::DelayedSafety {
                    delay: self.config.sentinel_delay,
                    trigger: SafetyTrigger::DsSentinel(temp),
                });
            }
        }

        if let Some(temp) = reading(&frame.object_temp, "objectTemp") {
            events.push(Event::display(
                Slot::ObjectTemperature,
                format!("{:.1}°C", temp),
            ));
            if temp > critical {
                safety.get_or_insert(SafetyTrigger::ObjectTemperature(temp));
            }
        }

        if let Some(temp) = reading(&frame.ambient_temp, "ambientTemp") {
            events.push(Event::display(
                Slot::AmbientTemperature,
                format!("{:.1}°C", temp),
            ));
        }

        let child = frame.device_id().and_then(Node::child);
        match (child, frame.status.as_deref()) {
            (Some(node), Some(status)) => {
                let badge = if status.eq_ignore_ascii_case("online") {
                    "Online"
                } else {
                    "Offline"
                };
                events.push(Event::display(Slot::NodeReported(node), badge));

                if let Some(battery) = reading(&frame.battery, "battery") {
                    events.push(Event::display(Slot::Battery(node), format!("{}%", battery)));
                }

                liveness.touch(node, now);
            }
            _ => liveness.touch(Node::Parent, now),
        }

        let orientation = frame
            .orientation
            .as_deref()
            .and_then(|axes| <[f64; 3]>::try_from(axes).ok());
        if let Some([x, y, z]) = orientation {
            events.push(Event::display(Slot::Orientation(Axis::X), format!("{:.2}", x)));
            events.push(Event::display(Slot::Orientation(Axis::Y), format!("{:.2}", y)));
            events.push(Event::display(Slot::Orientation(Axis::Z), format!("{:.2}", z)));
        }

        if let Some(trigger) = safety {
            events.push(Event::Alert(alert_text(trigger.temperature())));
            events.push(Event::Safety(trigger));
        }

        events
    }
}

pub fn alert_text(temperature: f64) -> String {
    format!(
        "WARNING: LIM Temperature Critical ({}°C)\nEmergency Brakes Engaged!",
        temperature
    )
}

/// Largest absolute component, `None` for an empty vector.
pub fn peak_magnitude(components: &[f64]) -> Option<f64> {
    components.iter().map(|c| c.abs()).reduce(f64::max)
}

pub fn speed_from_acceleration(acceleration: f64) -> f64 {
    acceleration.abs()
}

fn reading(reading: &Option<Reading>, field: &str) -> Option<f64> {
    match reading.as_ref()?.value() {
        Ok(value) if value.is_nan() => {
            warn!("[DISPATCH] Ignoring {}: not a number", field);
            None
        }
        Ok(value) => Some(value),
        Err(e) => {
            warn!("[DISPATCH] Ignoring {}: {}", field, e);
            None
        }
    }
}
