//! Data replay source: per-symbol cursors over an aligned calendar.
//!
//! The calendar is materialized once and shared read-only; every symbol keeps
//! its own cursor index into it, so symbols can be stepped independently and
//! exhaustion of one never stalls the others.

use super::align::{align_symbols, AlignedData, AlignedSeries};
use super::provider::{DataError, DataHandler, RawBar, SeriesLoader};
use crate::domain::{MarketEvent, Timestamp};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Outcome of stepping one symbol's cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolStep {
    /// A bar (native or forward-filled) at the step's calendar timestamp.
    Bar(MarketEvent),
    /// The calendar step precedes the symbol's first bar.
    NotStarted,
    /// The cursor already passed the last calendar entry.
    Exhausted,
}

/// Replays aligned series as market events, one calendar step at a time.
#[derive(Debug)]
pub struct ReplaySource {
    calendar: Arc<[Timestamp]>,
    series: Vec<AlignedSeries>,
    index: HashMap<String, usize>,
    /// Next calendar index to emit, per series.
    cursors: Vec<usize>,
}

impl ReplaySource {
    /// Build from native bars keyed by symbol.
    pub fn new(symbol_bars: BTreeMap<String, Vec<RawBar>>) -> Result<Self, DataError> {
        Ok(Self::from_aligned(align_symbols(symbol_bars)?))
    }

    /// Build by loading every symbol through `loader`.
    ///
    /// Fails on the first symbol that cannot be read, or that is requested
    /// more than once.
    pub fn load<S: AsRef<str>>(symbols: &[S], loader: &dyn SeriesLoader) -> Result<Self, DataError> {
        let mut symbol_bars: BTreeMap<String, Vec<RawBar>> = BTreeMap::new();
        for symbol in symbols {
            let symbol = symbol.as_ref();
            if symbol_bars.contains_key(symbol) {
                return Err(DataError::DuplicateSymbol {
                    symbol: symbol.to_string(),
                });
            }
            let bars = loader.load(symbol)?;
            symbol_bars.insert(symbol.to_string(), bars);
        }
        Self::new(symbol_bars)
    }

    pub fn from_aligned(aligned: AlignedData) -> Self {
        let AlignedData { calendar, series } = aligned;
        for s in &series {
            if s.forward_filled > 0 {
                tracing::debug!(
                    symbol = %s.symbol,
                    forward_filled = s.forward_filled,
                    calendar_len = calendar.len(),
                    "forward-filled missing bars"
                );
            }
        }
        let index = series
            .iter()
            .enumerate()
            .map(|(i, s)| (s.symbol.clone(), i))
            .collect();
        let cursors = vec![0; series.len()];
        Self {
            calendar,
            series,
            index,
            cursors,
        }
    }

    /// The shared calendar.
    pub fn calendar(&self) -> &Arc<[Timestamp]> {
        &self.calendar
    }

    /// Symbols in replay order (sorted).
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.symbol.as_str())
    }

    /// Number of forward-filled calendar entries for `symbol`.
    pub fn forward_filled(&self, symbol: &str) -> Option<usize> {
        self.index.get(symbol).map(|&i| self.series[i].forward_filled)
    }

    /// Step `symbol` by one calendar entry.
    pub fn next(&mut self, symbol: &str) -> Result<SymbolStep, DataError> {
        let i = *self
            .index
            .get(symbol)
            .ok_or_else(|| DataError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;
        Ok(self.step(i))
    }

    fn step(&mut self, i: usize) -> SymbolStep {
        let at = self.cursors[i];
        if at >= self.calendar.len() {
            return SymbolStep::Exhausted;
        }
        self.cursors[i] = at + 1;

        let series = &self.series[i];
        match &series.bars[at] {
            Some(bar) => SymbolStep::Bar(bar.to_event(&series.symbol, self.calendar[at])),
            None => SymbolStep::NotStarted,
        }
    }

    pub fn is_exhausted(&self, symbol: &str) -> bool {
        self.index
            .get(symbol)
            .map_or(true, |&i| self.cursors[i] >= self.calendar.len())
    }

    /// Minimum cursor timestamp over symbols that still have data.
    pub fn current_time(&self) -> Option<Timestamp> {
        self.cursors
            .iter()
            .filter(|&&at| at < self.calendar.len())
            .map(|&at| self.calendar[at])
            .min()
    }

    /// True once every symbol is exhausted.
    pub fn all_exhausted(&self) -> bool {
        self.current_time().is_none()
    }
}

impl DataHandler for ReplaySource {
    fn next_bars(&mut self) -> Vec<MarketEvent> {
        let Some(now) = self.current_time() else {
            return Vec::new();
        };
        let mut bars = Vec::with_capacity(self.series.len());
        for i in 0..self.series.len() {
            // Only symbols sitting on the current tick move; a symbol stepped
            // ahead on its own waits for the others to catch up.
            let at = self.cursors[i];
            if at >= self.calendar.len() || self.calendar[at] != now {
                continue;
            }
            if let SymbolStep::Bar(bar) = self.step(i) {
                bars.push(bar);
            }
        }
        bars
    }

    fn symbol_list(&self) -> Vec<String> {
        self.series.iter().map(|s| s.symbol.clone()).collect()
    }

    fn current_tick(&self) -> Option<Timestamp> {
        self.current_time()
    }

    fn advance_to(&mut self, start: Timestamp) {
        let first = self.calendar.partition_point(|ts| *ts < start);
        for cursor in &mut self.cursors {
            *cursor = (*cursor).max(first);
        }
    }
}
