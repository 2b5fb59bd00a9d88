//! The closed set of events that travel over the bus, and their causal order.

use super::{FillEvent, MarketEvent, OrderEvent, SignalEvent, Timestamp};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Construction-time violations of event invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("{kind} quantity must be non-negative, got {quantity}")]
    NegativeQuantity { kind: &'static str, quantity: i64 },
}

/// Sentinel published once per drain: nothing else is pending for this tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueDrainedEvent {
    /// Latest timestamp the bus has dispatched, if any.
    pub timestamp: Option<Timestamp>,
    /// Number of pending events the drain dispatched before going empty.
    pub dispatched: usize,
}

/// Every event the bus can carry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
    QueueDrained(QueueDrainedEvent),
}

/// Subscription key. `Any` matches every concrete kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EventKind {
    Market,
    Signal,
    Order,
    Fill,
    QueueDrained,
    Any,
}

impl EventKind {
    /// Tie-break rank between events sharing a timestamp.
    ///
    /// Market < Signal < Order < Fill < QueueDrained. `Any` never describes a
    /// concrete event and ranks last.
    pub fn rank(self) -> u8 {
        match self {
            EventKind::Market => 0,
            EventKind::Signal => 1,
            EventKind::Order => 2,
            EventKind::Fill => 3,
            EventKind::QueueDrained => 4,
            EventKind::Any => u8::MAX,
        }
    }

    /// True if a subscription to `self` should receive an event of kind `concrete`.
    pub fn accepts(self, concrete: EventKind) -> bool {
        self == EventKind::Any || self == concrete
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Market => "market",
            EventKind::Signal => "signal",
            EventKind::Order => "order",
            EventKind::Fill => "fill",
            EventKind::QueueDrained => "queue_drained",
            EventKind::Any => "any",
        };
        f.write_str(name)
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
            Event::QueueDrained(_) => EventKind::QueueDrained,
        }
    }

    /// Simulation time of the event. Only the drained sentinel can lack one.
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Event::Market(e) => Some(e.timestamp),
            Event::Signal(e) => Some(e.timestamp),
            Event::Order(e) => Some(e.timestamp()),
            Event::Fill(e) => Some(e.timestamp()),
            Event::QueueDrained(e) => e.timestamp,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Event::Market(e) => Some(&e.symbol),
            Event::Signal(e) => Some(&e.symbol),
            Event::Order(e) => Some(e.symbol()),
            Event::Fill(e) => Some(e.symbol()),
            Event::QueueDrained(_) => None,
        }
    }

    /// Total causal order: timestamp ascending, then kind rank.
    ///
    /// Deliberately not a `PartialOrd` impl: two distinct events can compare
    /// `Equal` here, which would disagree with the structural `PartialEq`.
    pub fn causal_cmp(&self, other: &Event) -> Ordering {
        self.timestamp()
            .cmp(&other.timestamp())
            .then_with(|| self.kind().rank().cmp(&other.kind().rank()))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.timestamp() {
            Some(ts) => write!(f, "{} event at {ts}", self.kind())?,
            None => write!(f, "{} event", self.kind())?,
        }
        if let Some(symbol) = self.symbol() {
            write!(f, " for {symbol}")?;
        }
        Ok(())
    }
}

impl From<MarketEvent> for Event {
    fn from(e: MarketEvent) -> Self {
        Event::Market(e)
    }
}

impl From<SignalEvent> for Event {
    fn from(e: SignalEvent) -> Self {
        Event::Signal(e)
    }
}

impl From<OrderEvent> for Event {
    fn from(e: OrderEvent) -> Self {
        Event::Order(e)
    }
}

impl From<FillEvent> for Event {
    fn from(e: FillEvent) -> Self {
        Event::Fill(e)
    }
}
