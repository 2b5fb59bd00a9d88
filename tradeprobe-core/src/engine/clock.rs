//! Wildcard observer the driver uses to follow what the bus delivered.

use super::bus::{HandlerError, Observer};
use crate::domain::{Event, Timestamp};

/// Tracks the latest market timestamp and how many drains completed.
///
/// Derived events can be stamped by observers at any time (a broker settling
/// later, say), so only market events move the data clock.
#[derive(Debug, Default)]
pub struct ClockTracker {
    last_market: Option<Timestamp>,
    drained: u64,
    events_seen: u64,
}

impl ClockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest timestamp of any market event delivered so far.
    pub fn last_market(&self) -> Option<Timestamp> {
        self.last_market
    }

    /// Number of `QueueDrained` sentinels received.
    pub fn drained(&self) -> u64 {
        self.drained
    }

    /// Number of non-sentinel events received.
    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }
}

impl Observer for ClockTracker {
    fn handle(&mut self, event: &Event) -> Result<(), HandlerError> {
        match event {
            Event::QueueDrained(_) => self.drained += 1,
            Event::Market(bar) => {
                self.events_seen += 1;
                let ts = bar.timestamp;
                self.last_market = Some(self.last_market.map_or(ts, |m| m.max(ts)));
            }
            Event::Signal(_) | Event::Order(_) | Event::Fill(_) => self.events_seen += 1,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "clock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, FillEvent, MarketEvent, QueueDrainedEvent};
    use chrono::NaiveDate;

    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2022, 6, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn tracks_latest_market_timestamp_and_drains() {
        let mut tracker = ClockTracker::new();
        for d in [16, 15] {
            tracker
                .handle(&MarketEvent::new(day(d), "AAPL", 1.0, 1.0, 1.0, 1.0, 1).into())
                .unwrap();
        }
        tracker
            .handle(&Event::QueueDrained(QueueDrainedEvent {
                timestamp: Some(day(16)),
                dispatched: 0,
            }))
            .unwrap();

        assert_eq!(tracker.last_market(), Some(day(16)));
        assert_eq!(tracker.events_seen(), 2);
        assert_eq!(tracker.drained(), 1);
    }

    #[test]
    fn derived_events_do_not_move_the_data_clock() {
        let mut tracker = ClockTracker::new();
        tracker
            .handle(&MarketEvent::new(day(15), "AAPL", 1.0, 1.0, 1.0, 1.0, 1).into())
            .unwrap();
        tracker
            .handle(&FillEvent::new(day(29), "AAPL", 10, Direction::Buy, 1.0, 0.0).unwrap().into())
            .unwrap();

        assert_eq!(tracker.last_market(), Some(day(15)));
        assert_eq!(tracker.events_seen(), 2);
    }
}
