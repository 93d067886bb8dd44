use crate::{
    dispatch::{DispatchConfig, Dispatcher, Event},
    display::Slot,
    frame::DecodedFrame,
    history::{DEFAULT_HISTORY_LIMIT, History},
    liveness::Liveness,
};
use chrono::{DateTime, TimeDelta, Utc};
use framing::{Deframer, FramingMode, JsonDeframer};
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub framing: FramingMode,
    pub dispatch: DispatchConfig,
    pub liveness_timeout: TimeDelta,
    pub record_history: bool,
    /// Most frames kept in the history; `None` keeps every frame.
    pub history_limit: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            framing: FramingMode::default(),
            dispatch: DispatchConfig::default(),
            liveness_timeout: TimeDelta::seconds(5),
            record_history: true,
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
        }
    }
}

/// Everything one connection to the pod accumulates: the partial frame
/// buffer, node liveness and the frame history.
///
/// A new session is created for every connection attempt, so nothing leaks
/// from one link into the next.
pub struct Session {
    deframer: JsonDeframer,
    dispatcher: Dispatcher,
    liveness: Liveness,
    history: History,
    dropped: usize,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            deframer: JsonDeframer::new(config.framing),
            dispatcher: Dispatcher::new(config.dispatch),
            liveness: Liveness::new(config.liveness_timeout),
            history: History::new(config.record_history, config.history_limit),
            dropped: 0,
        }
    }

    /// Decodes and dispatches every frame completed by `chunk`.
    ///
    /// Frames that are not valid JSON objects are logged and dropped;
    /// decoding carries on with the rest of the buffer.
    pub fn ingest(&mut self, chunk: &str, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();

        for raw in self.deframer.feed(chunk) {
            match DecodedFrame::try_from(raw.as_str()) {
                Ok(frame) => {
                    debug!("[SESSION] Frame: {}", raw);
                    events.extend(self.dispatcher.dispatch(&frame.fields, &mut self.liveness, now));
                    self.history.record(now, frame.raw);
                }
                Err(e) => {
                    warn!("[SESSION] Dropping frame {:?}: {}", raw.as_str(), e);
                    self.dropped += 1;
                }
            }
        }

        events
    }

    /// Classifies every node as online or disconnected.
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<Event> {
        self.liveness
            .evaluate(now)
            .into_iter()
            .flat_map(|report| {
                [
                    Event::Display {
                        slot: Slot::NodeStatus(report.node),
                        text: report.link.to_string(),
                    },
                    Event::Display {
                        slot: Slot::NodeLastSeen(report.node),
                        text: report.last_seen,
                    },
                ]
            })
            .collect()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Number of frames dropped because they did not parse.
    pub fn dropped_frames(&self) -> usize {
        self.dropped
    }

    /// Text received but not yet part of a complete frame.
    pub fn buffered(&self) -> &str {
        self.deframer.buffered()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SafetyTrigger, liveness::Node};
    use serde_json::json;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    fn slot_text(events: &[Event], wanted: Slot) -> Option<String> {
        events.iter().find_map(|e| match e {
            Event::Display { slot, text } if *slot == wanted => Some(text.clone()),
            _ => None,
        })
    }

    #[test]
    fn malformed_frame_between_valid_frames() {
        let mut session = Session::default();

        let events = session.ingest(
            r#"{"temperature": 40}{"temperature": oops}{"accel": [2]}"#,
            at(0),
        );

        assert_eq!(slot_text(&events, Slot::MotorTemperature), Some("40.0°C".into()));
        assert_eq!(slot_text(&events, Slot::Speed), Some("2.00 m/s".into()));
        assert_eq!(session.dropped_frames(), 1);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.buffered(), "");
    }

    #[test]
    fn hot_frame_split_across_chunks_brakes_once() {
        let mut session = Session::default();

        let mut events = session.ingest(r#"{"tempera"#, at(0));
        assert!(events.is_empty());
        events.extend(session.ingest(r#"ture": 121}"#, at(0)));

        let brakes: Vec<&Event> = events
            .iter()
            .filter(|e| matches!(e, Event::Safety(_)))
            .collect();
        assert_eq!(brakes, vec![&Event::Safety(SafetyTrigger::MotorTemperature(121.0))]);
    }

    #[test]
    fn tick_reports_disconnected_after_silence() {
        let mut session = Session::default();
        session.ingest(r#"{"device":1,"status":"online"}"#, at(0));

        let fresh = session.tick(at(1));
        let stale = session.tick(at(6));

        assert_eq!(slot_text(&fresh, Slot::NodeStatus(Node::Child(1))), Some("Online".into()));
        assert_eq!(
            slot_text(&stale, Slot::NodeStatus(Node::Child(1))),
            Some("Disconnected".into())
        );
        assert_eq!(
            slot_text(&stale, Slot::NodeLastSeen(Node::Child(1))),
            Some("just now".into())
        );
        assert_eq!(
            slot_text(&stale, Slot::NodeLastSeen(Node::Child(2))),
            Some("never".into())
        );
    }

    #[test]
    fn mistyped_field_does_not_hide_hot_temperature() {
        for text in [
            r#"{"temperature":130,"status":1}"#,
            r#"{"temperature":130,"accel":[1,null]}"#,
            r#"{"temperature":130,"orientation":"flat"}"#,
        ] {
            let mut session = Session::default();

            let events = session.ingest(text, at(0));

            let brakes = events
                .iter()
                .filter(|e| matches!(e, Event::Safety(_)))
                .count();
            assert_eq!(brakes, 1, "{}", text);
            assert_eq!(session.dropped_frames(), 0);
        }
    }

    #[test]
    fn reported_offline_survives_tick() {
        let mut session = Session::default();

        let frame = session.ingest(r#"{"device":1,"status":"offline"}"#, at(0));
        let tick = session.tick(at(0));

        assert_eq!(
            slot_text(&frame, Slot::NodeReported(Node::Child(1))),
            Some("Offline".into())
        );
        assert_eq!(slot_text(&tick, Slot::NodeReported(Node::Child(1))), None);
        assert_eq!(slot_text(&tick, Slot::NodeStatus(Node::Child(1))), Some("Online".into()));
        assert_eq!(slot_text(&frame, Slot::NodeStatus(Node::Child(1))), None);
    }

    #[test]
    fn tick_covers_every_node() {
        let session = Session::default();

        let events = session.tick(at(0));

        assert_eq!(events.len(), 2 * Node::ALL.len());
    }

    #[test]
    fn history_keeps_raw_frames() {
        let mut session = Session::default();

        session.ingest(r#"{"device":2,"status":"online","battery":80,"rssi":-40}"#, at(3));

        let entry = session.history().get(0).unwrap();
        assert_eq!(entry.received_at, at(3));
        assert_eq!(entry.frame["rssi"], json!(-40));
    }

    #[test]
    fn history_can_be_disabled() {
        let mut session = Session::new(SessionConfig {
            record_history: false,
            ..SessionConfig::default()
        });

        session.ingest(r#"{"temperature": 40}"#, at(0));

        assert!(session.history().is_empty());
    }

    #[test]
    fn balanced_framing_keeps_nested_frames_whole() {
        let mut session = Session::new(SessionConfig {
            framing: FramingMode::Balanced,
            ..SessionConfig::default()
        });

        let events = session.ingest(r#"{"meta":{"fw":"1.0"},"temperature":50}"#, at(0));

        assert_eq!(slot_text(&events, Slot::MotorTemperature), Some("50.0°C".into()));
        assert_eq!(session.dropped_frames(), 0);
    }
}
