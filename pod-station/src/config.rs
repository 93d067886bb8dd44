use chrono::TimeDelta;
use framing::FramingMode;
use serde::Deserialize;
use std::time::Duration;
use telemetry::{
    DEFAULT_HISTORY_LIMIT, DispatchConfig, SessionConfig, VoltageLayout,
    dispatch::{CRITICAL_TEMPERATURE, SENTINEL_DELAY, SENTINEL_TEMPERATURE},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub safety: SafetyConfig,
    pub liveness: LivenessConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            timeout_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub critical_temperature: f64,
    pub sentinel_temperature: f64,
    pub sentinel_delay_seconds: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            critical_temperature: CRITICAL_TEMPERATURE,
            sentinel_temperature: SENTINEL_TEMPERATURE,
            sentinel_delay_seconds: SENTINEL_DELAY.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub timeout_seconds: u32,
    pub tick_seconds: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 5,
            tick_seconds: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub framing: FramingMode,
    pub voltage_layout: VoltageLayout,
    pub record_history: bool,
    /// Frames kept in the history; 0 keeps every frame.
    pub history_limit: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            framing: FramingMode::default(),
            voltage_layout: VoltageLayout::default(),
            record_history: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from `pod-station/config.toml` (optional), then
    /// environment variables with the `POD` prefix, e.g. `POD_SERIAL__PORT`.
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("pod-station/config").required(false))
            .add_source(
                config::Environment::with_prefix("POD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            framing: self.telemetry.framing,
            dispatch: DispatchConfig {
                critical_temperature: self.safety.critical_temperature,
                sentinel_temperature: self.safety.sentinel_temperature,
                sentinel_delay: Duration::from_secs(self.safety.sentinel_delay_seconds),
                voltage_layout: self.telemetry.voltage_layout,
            },
            liveness_timeout: TimeDelta::seconds(i64::from(self.liveness.timeout_seconds)),
            record_history: self.telemetry.record_history,
            history_limit: match self.telemetry.history_limit {
                0 => None,
                limit => Some(limit),
            },
        }
    }
}

impl SerialConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LivenessConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_seconds.max(1))
    }
}
