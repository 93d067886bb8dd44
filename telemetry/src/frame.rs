use log::warn;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::fmt;

/// A numeric reading as sent by the nodes: either a JSON number or a numeric
/// string such as `"42.5"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingError(pub String);

impl fmt::Display for ReadingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a number", self.0)
    }
}

impl std::error::Error for ReadingError {}

impl Reading {
    pub fn value(&self) -> Result<f64, ReadingError> {
        match self {
            Reading::Number(n) => Ok(*n),
            Reading::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ReadingError(s.clone())),
        }
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::Number(value)
    }
}

/// The fields of a telemetry frame the station acts upon.
///
/// Every field is optional and independent: a frame may carry any subset, and
/// fields not listed here are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Linear induction motor temperature.
    pub temperature: Option<Reading>,
    /// IMU acceleration components.
    pub accel: Option<Vec<f64>>,
    #[serde(rename = "VB1")]
    pub vb1: Option<Value>,
    #[serde(rename = "VB2")]
    pub vb2: Option<Value>,
    #[serde(rename = "VB3")]
    pub vb3: Option<Value>,
    #[serde(rename = "mlxTemperature")]
    pub mlx_temperature: Option<Reading>,
    #[serde(rename = "dsTemperature")]
    pub ds_temperature: Option<Reading>,
    #[serde(rename = "objectTemp")]
    pub object_temp: Option<Reading>,
    #[serde(rename = "ambientTemp")]
    pub ambient_temp: Option<Reading>,
    /// Id of the child node reporting its status.
    pub device: Option<Reading>,
    pub status: Option<String>,
    pub battery: Option<Reading>,
    pub orientation: Option<Vec<f64>>,
}

impl TelemetryFrame {
    /// Picks the known fields out of a JSON object.
    ///
    /// Each field is decoded on its own: one with an unexpected type is
    /// logged and treated as absent, and the rest of the frame still counts.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            temperature: field(object, "temperature"),
            accel: field(object, "accel"),
            vb1: field(object, "VB1"),
            vb2: field(object, "VB2"),
            vb3: field(object, "VB3"),
            mlx_temperature: field(object, "mlxTemperature"),
            ds_temperature: field(object, "dsTemperature"),
            object_temp: field(object, "objectTemp"),
            ambient_temp: field(object, "ambientTemp"),
            device: field(object, "device"),
            status: field(object, "status"),
            battery: field(object, "battery"),
            orientation: field(object, "orientation"),
        }
    }

    /// The three battery voltages, only when all of them are present.
    pub fn voltages(&self) -> Option<[&Value; 3]> {
        Some([self.vb1.as_ref()?, self.vb2.as_ref()?, self.vb3.as_ref()?])
    }

    /// The reporting device id, if it is a whole number.
    pub fn device_id(&self) -> Option<u8> {
        let id = self.device.as_ref()?.value().ok()?;

        if id.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&id) {
            Some(id as u8)
        } else {
            None
        }
    }
}

fn field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<T> {
    match object.get(key)? {
        Value::Null => None,
        value => match T::deserialize(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("[FRAME] Ignoring {}: {}", key, e);
                None
            }
        },
    }
}

#[derive(Debug)]
pub enum FrameError {
    Syntax(serde_json::Error),
    NotAnObject,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Syntax(e) => write!(f, "invalid JSON: {}", e),
            FrameError::NotAnObject => write!(f, "frame is not a JSON object"),
        }
    }
}

impl std::error::Error for FrameError {}

/// A successfully parsed frame: the raw JSON object and its typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub raw: Value,
    pub fields: TelemetryFrame,
}

impl TryFrom<&str> for DecodedFrame {
    type Error = FrameError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        let raw: Value = serde_json::from_str(text).map_err(FrameError::Syntax)?;

        let fields = match raw.as_object() {
            Some(object) => TelemetryFrame::from_object(object),
            None => return Err(FrameError::NotAnObject),
        };

        Ok(DecodedFrame { raw, fields })
    }
}

/// Renders a raw JSON value the way the display shows it: strings without
/// quotes, everything else as JSON.
pub fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_temperature_frame() {
        let frame = DecodedFrame::try_from(r#"{"temperature": 42.5}"#).unwrap();

        assert_eq!(frame.fields.temperature, Some(Reading::Number(42.5)));
        assert_eq!(frame.fields.accel, None);
    }

    #[test]
    fn integer_and_string_readings() {
        let frame =
            DecodedFrame::try_from(r#"{"temperature": 121, "dsTemperature": " 95.0 "}"#).unwrap();

        assert_eq!(frame.fields.temperature.unwrap().value(), Ok(121.0));
        assert_eq!(frame.fields.ds_temperature.unwrap().value(), Ok(95.0));
    }

    #[test]
    fn unparseable_reading() {
        let reading = Reading::Text("hot".to_string());

        assert_eq!(reading.value(), Err(ReadingError("hot".to_string())));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let frame = DecodedFrame::try_from(r#"{"firmware":"1.2","uptime":3}"#).unwrap();

        assert_eq!(frame.fields, TelemetryFrame::default());
        assert_eq!(frame.raw["uptime"], 3);
    }

    #[test]
    fn voltages_require_all_three() {
        let partial = DecodedFrame::try_from(r#"{"VB1":12,"VB2":24}"#).unwrap();
        let full = DecodedFrame::try_from(r#"{"VB1":12,"VB2":24,"VB3":"48"}"#).unwrap();

        assert!(partial.fields.voltages().is_none());
        let [vb1, _, vb3] = full.fields.voltages().unwrap();
        assert_eq!(raw_text(vb1), "12");
        assert_eq!(raw_text(vb3), "48");
    }

    #[test]
    fn device_id_must_be_whole() {
        let whole = DecodedFrame::try_from(r#"{"device":2}"#).unwrap();
        let fractional = DecodedFrame::try_from(r#"{"device":2.5}"#).unwrap();
        let text = DecodedFrame::try_from(r#"{"device":"3"}"#).unwrap();

        assert_eq!(whole.fields.device_id(), Some(2));
        assert_eq!(fractional.fields.device_id(), None);
        assert_eq!(text.fields.device_id(), Some(3));
    }

    #[test]
    fn malformed_frames() {
        assert!(matches!(
            DecodedFrame::try_from(r#"{"a":"#),
            Err(FrameError::Syntax(_))
        ));
        assert!(matches!(
            DecodedFrame::try_from("[1,2]"),
            Err(FrameError::NotAnObject)
        ));
    }

    #[test]
    fn mistyped_field_is_dropped_alone() {
        let frame =
            DecodedFrame::try_from(r#"{"temperature":130,"accel":"fast","status":1}"#).unwrap();

        assert_eq!(frame.fields.temperature, Some(Reading::Number(130.0)));
        assert_eq!(frame.fields.accel, None);
        assert_eq!(frame.fields.status, None);
    }

    #[test]
    fn partially_invalid_vector_is_dropped() {
        let frame =
            DecodedFrame::try_from(r#"{"accel":[1,null],"orientation":[0.1,0.2,0.3]}"#).unwrap();

        assert_eq!(frame.fields.accel, None);
        assert_eq!(frame.fields.orientation, Some(vec![0.1, 0.2, 0.3]));
    }
}
