//! Pod telemetry: decoding frames, turning their fields into display updates
//! and safety requests, and tracking which nodes are still talking.

pub mod dispatch;
pub mod display;
pub mod frame;
pub mod history;
pub mod liveness;
pub mod session;

pub use dispatch::{DispatchConfig, Dispatcher, Event, SafetyTrigger};
pub use display::{Axis, Slot, VoltageLayout};
pub use frame::{DecodedFrame, FrameError, Reading, TelemetryFrame};
pub use history::{DEFAULT_HISTORY_LIMIT, History, HistoryEntry};
pub use liveness::{Link, Liveness, Node, NodeReport};
pub use session::{Session, SessionConfig};
