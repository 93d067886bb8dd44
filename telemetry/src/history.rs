use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::VecDeque;

/// Frames kept by default before the oldest are dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 100_000;

/// One received frame, as it arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub received_at: DateTime<Utc>,
    pub frame: Value,
}

/// Frames decoded during a session, oldest first.
///
/// Holds at most `limit` entries; past that the oldest are dropped. A limit
/// of `None` keeps everything for the life of the session.
#[derive(Debug, Clone, Default)]
pub struct History {
    enabled: bool,
    limit: Option<usize>,
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new(enabled: bool, limit: Option<usize>) -> Self {
        Self {
            enabled,
            limit,
            entries: VecDeque::new(),
        }
    }

    pub fn record(&mut self, received_at: DateTime<Utc>, frame: Value) {
        if !self.enabled || self.limit == Some(0) {
            return;
        }

        if let Some(limit) = self.limit {
            while self.entries.len() >= limit {
                self.entries.pop_front();
            }
        }

        self.entries.push_back(HistoryEntry { received_at, frame });
    }

    pub fn entries(&self) -> impl ExactSizeIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for History {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_arrival_order() {
        let mut history = History::new(true, None);
        let now = Utc::now();

        history.record(now, json!({"a": 1}));
        history.record(now, json!({"b": 2}));

        let frames: Vec<&Value> = history.entries().map(|e| &e.frame).collect();
        assert_eq!(frames, vec![&json!({"a": 1}), &json!({"b": 2})]);
    }

    #[test]
    fn limit_drops_oldest_entries() {
        let mut history = History::new(true, Some(2));
        let now = Utc::now();

        for n in 0..5 {
            history.record(now, json!({ "n": n }));
        }

        let frames: Vec<&Value> = history.entries().map(|e| &e.frame).collect();
        assert_eq!(frames, vec![&json!({"n": 3}), &json!({"n": 4})]);
    }

    #[test]
    fn disabled_history_stays_empty() {
        let mut history = History::new(false, None);

        history.record(Utc::now(), json!({"a": 1}));

        assert!(history.is_empty());
    }

    #[test]
    fn entries_serialize_for_export() {
        let mut history = History::new(true, None);
        let received_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        history.record(received_at, json!({"temperature": 42.5}));

        let exported = serde_json::to_value(&history).unwrap();

        assert_eq!(
            exported,
            json!([{"received_at": "2023-11-14T22:13:20Z", "frame": {"temperature": 42.5}}])
        );
    }
}
