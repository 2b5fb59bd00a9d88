//! Property tests for bus and alignment invariants.
//!
//! Uses proptest to verify:
//! 1. Causal order: drained events reach observers sorted by (timestamp, kind)
//! 2. Drain completeness: queue empty afterwards, exactly one sentinel
//! 3. Alignment: calendar is the union, no gaps after a symbol starts
//! 4. Non-negativity: order and fill construction follow the quantity sign

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use tradeprobe_core::data::{align_symbols, RawBar};
use tradeprobe_core::domain::{
    Direction, Event, EventKind, FillEvent, MarketEvent, OrderEvent, SignalEvent, SignalType,
    Timestamp,
};
use tradeprobe_core::engine::{EventBus, HandlerError, Observer};

fn base() -> Timestamp {
    NaiveDate::from_ymd_opt(2022, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn at(offset: i64) -> Timestamp {
    base() + Duration::days(offset)
}

/// Derived event to publish from inside a handler: (day offset, kind 1..=3).
fn arb_derived() -> impl Strategy<Value = Vec<(i64, u8)>> {
    prop::collection::vec((0..5i64, 1..=3u8), 0..24)
}

fn derived_event(offset: i64, kind: u8) -> Event {
    let ts = at(offset);
    match kind {
        1 => SignalEvent::new(ts, "AAPL", SignalType::Long).into(),
        2 => OrderEvent::new(ts, "AAPL", 1, Direction::Buy).unwrap().into(),
        _ => FillEvent::new(ts, "AAPL", 1, Direction::Buy, 10.0, 0.0)
            .unwrap()
            .into(),
    }
}

/// Publishes a scripted batch of derived events the first time it sees a bar.
struct Scripted {
    bus: Arc<EventBus>,
    script: Vec<Event>,
}

impl Observer for Scripted {
    fn handle(&mut self, event: &Event) -> Result<(), HandlerError> {
        if let Event::Market(_) = event {
            for e in self.script.drain(..) {
                self.bus.publish(e)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct Recorder {
    seen: Vec<Event>,
}

impl Observer for Recorder {
    fn handle(&mut self, event: &Event) -> Result<(), HandlerError> {
        self.seen.push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recorder"
    }
}

// ── 1 + 2. Causal order and drain completeness ──────────────────────

proptest! {
    #[test]
    fn drained_events_arrive_in_causal_order(script in arb_derived()) {
        let bus = EventBus::shared();
        let n = script.len();
        let scripted = Arc::new(Mutex::new(Scripted {
            bus: Arc::clone(&bus),
            script: script.iter().map(|&(o, k)| derived_event(o, k)).collect(),
        }));
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        bus.register(&scripted, EventKind::Market);
        bus.register(&recorder, EventKind::Any);

        bus.publish(MarketEvent::new(at(0), "AAPL", 1.0, 2.0, 0.5, 1.5, 1)).unwrap();
        let drained = bus.drain().unwrap();

        prop_assert!(bus.is_empty());
        prop_assert_eq!(drained.dispatched, n);

        let seen = &recorder.lock().unwrap().seen;
        prop_assert_eq!(seen.len(), n + 2);
        prop_assert_eq!(seen[0].kind(), EventKind::Market);
        prop_assert_eq!(seen[n + 1].kind(), EventKind::QueueDrained);

        let derived = &seen[1..=n];
        for pair in derived.windows(2) {
            prop_assert_ne!(pair[0].causal_cmp(&pair[1]), Ordering::Greater);
        }

        let sentinels = seen.iter().filter(|e| e.kind() == EventKind::QueueDrained).count();
        prop_assert_eq!(sentinels, 1);
    }
}

// ── 3. Alignment ─────────────────────────────────────────────────────

fn arb_days() -> impl Strategy<Value = BTreeSet<i64>> {
    prop::collection::btree_set(0..30i64, 1..15)
}

fn bars_for(days: &BTreeSet<i64>) -> Vec<RawBar> {
    days.iter()
        .map(|&d| RawBar {
            timestamp: at(d),
            open: d as f64,
            high: d as f64 + 1.0,
            low: d as f64 - 1.0,
            close: d as f64,
            adj_close: d as f64,
            volume: d as u64,
        })
        .collect()
}

proptest! {
    #[test]
    fn calendar_is_union_and_has_no_gaps(a in arb_days(), b in arb_days()) {
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), bars_for(&a));
        input.insert("B".to_string(), bars_for(&b));
        let aligned = align_symbols(input).unwrap();

        let union: Vec<Timestamp> = a.union(&b).map(|&d| at(d)).collect();
        prop_assert_eq!(aligned.calendar.to_vec(), union);

        for (series, days) in aligned.series.iter().zip([&a, &b]) {
            let first = series.first_index().unwrap();
            prop_assert_eq!(aligned.calendar[first], at(*days.iter().next().unwrap()));
            for (i, entry) in series.bars.iter().enumerate() {
                if i < first {
                    prop_assert!(entry.is_none());
                    continue;
                }
                // Forward-fill: the value is the latest native bar at or before this entry.
                let ts = aligned.calendar[i];
                let expected = days.iter().rev().find(|&&d| at(d) <= ts).unwrap();
                prop_assert_eq!(entry.as_ref().unwrap().close, *expected as f64);
            }
        }
    }
}

// ── 4. Non-negativity ────────────────────────────────────────────────

proptest! {
    #[test]
    fn quantity_sign_decides_construction(q in -1000i64..1000) {
        let order = OrderEvent::new(at(0), "AAPL", q, Direction::Buy);
        let fill = FillEvent::new(at(0), "AAPL", q, Direction::Sell, 1.0, 0.0);
        prop_assert_eq!(order.is_ok(), q >= 0);
        prop_assert_eq!(fill.is_ok(), q >= 0);
    }
}
