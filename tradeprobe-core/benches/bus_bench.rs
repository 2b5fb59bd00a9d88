//! Criterion benchmarks for TradeProbe hot paths.
//!
//! Benchmarks:
//! 1. Bus publish (top-level delivery to N observers)
//! 2. Bus drain (queued derived events resolved in causal order)
//! 3. Calendar alignment (union + forward-fill)
//! 4. Full driver run (replay -> bus -> drain per tick)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tradeprobe_core::data::{align_symbols, RawBar, ReplaySource};
use tradeprobe_core::domain::{Event, EventKind, MarketEvent, SignalEvent, SignalType};
use tradeprobe_core::engine::{DispatchMode, EventBus, HandlerError, Observer, SimulationDriver};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_raw_bars(n: usize, stride: i64) -> Vec<RawBar> {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            RawBar {
                timestamp: base + chrono::Duration::days(i as i64 * stride),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                adj_close: close,
                volume: 1_000_000 + (i as u64 % 500_000),
            }
        })
        .collect()
}

fn make_symbols(bars: usize, symbols: usize) -> BTreeMap<String, Vec<RawBar>> {
    (0..symbols)
        .map(|s| (format!("SYM{s}"), make_raw_bars(bars, 1 + (s as i64 % 2))))
        .collect()
}

fn bar() -> MarketEvent {
    let ts = chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    MarketEvent::new(ts, "SPY", 100.0, 101.0, 99.0, 100.5, 1_000)
}

struct Sink;

impl Observer for Sink {
    fn handle(&mut self, event: &Event) -> Result<(), HandlerError> {
        black_box(event);
        Ok(())
    }

    fn name(&self) -> &str {
        "sink"
    }
}

/// Turns every bar into a signal.
struct Signaller {
    bus: Arc<EventBus>,
}

impl Observer for Signaller {
    fn handle(&mut self, event: &Event) -> Result<(), HandlerError> {
        if let Event::Market(bar) = event {
            self.bus
                .publish(SignalEvent::new(bar.timestamp, &bar.symbol, SignalType::Long))?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "signaller"
    }
}

// ── 1. Publish ───────────────────────────────────────────────────────

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus_publish");

    for &observers in &[1usize, 8, 32] {
        let bus = EventBus::shared();
        let sinks: Vec<_> = (0..observers).map(|_| Arc::new(Mutex::new(Sink))).collect();
        for sink in &sinks {
            bus.register(sink, EventKind::Market);
        }
        let event = bar();

        group.bench_with_input(
            BenchmarkId::new("sequential", observers),
            &observers,
            |b, _| {
                b.iter(|| bus.publish(black_box(event.clone())));
            },
        );
    }

    group.finish();
}

// ── 2. Drain ─────────────────────────────────────────────────────────

fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus_drain");

    for &bars in &[10usize, 100] {
        let bus = EventBus::shared();
        let signaller = Arc::new(Mutex::new(Signaller {
            bus: Arc::clone(&bus),
        }));
        let sink = Arc::new(Mutex::new(Sink));
        bus.register(&signaller, EventKind::Market);
        bus.register(&sink, EventKind::Signal);
        let event = bar();

        group.bench_with_input(BenchmarkId::new("signals", bars), &bars, |b, &n| {
            b.iter(|| {
                for _ in 0..n {
                    let _ = bus.publish(event.clone());
                }
                bus.drain()
            });
        });
    }

    group.finish();
}

// ── 3. Alignment ─────────────────────────────────────────────────────

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align_symbols");

    for &symbols in &[2usize, 10] {
        let input = make_symbols(1260, symbols);
        group.bench_with_input(BenchmarkId::new("1260_bars", symbols), &symbols, |b, _| {
            b.iter(|| align_symbols(black_box(input.clone())));
        });
    }

    group.finish();
}

// ── 4. Driver ────────────────────────────────────────────────────────

fn bench_driver(c: &mut Criterion) {
    let mut group = c.benchmark_group("driver_run");
    let input = make_symbols(1260, 10);
    let aligned = align_symbols(input).unwrap();
    let start = aligned.calendar[0];
    let end = *aligned.calendar.last().unwrap() + chrono::Duration::days(1);

    for (label, mode) in [
        ("sequential", DispatchMode::Sequential),
        ("parallel", DispatchMode::Parallel),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| {
                let bus = Arc::new(EventBus::new(mode));
                let signaller = Arc::new(Mutex::new(Signaller {
                    bus: Arc::clone(&bus),
                }));
                bus.register(&signaller, EventKind::Market);
                let source = ReplaySource::from_aligned(aligned.clone());
                let mut driver = SimulationDriver::new(bus, source, start, end).unwrap();
                driver.run()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_publish, bench_drain, bench_align, bench_driver);
criterion_main!(benches);
