use chrono::{DateTime, Utc};

/// Where the station gets the wall-clock instant it stamps frames and
/// liveness checks with.
pub trait TimeProvider {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeProvider for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Starts at a fixed instant and moves with tokio's clock, so paused-time
/// tests decide how much wall time passes.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    base: DateTime<Utc>,
    start: tokio::time::Instant,
}

#[cfg(test)]
impl MockClock {
    pub fn new() -> Self {
        Self {
            base: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            start: tokio::time::Instant::now(),
        }
    }
}

#[cfg(test)]
impl TimeProvider for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + chrono::TimeDelta::from_std(self.start.elapsed()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn mock_clock_follows_tokio_time() {
        let clock = MockClock::new();
        let before = clock.now();

        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(clock.now() - before, TimeDelta::seconds(6));
    }
}
