//! Data capabilities and structured error types.
//!
//! The driver only ever sees a [`DataHandler`]; the replay source only ever
//! sees a [`SeriesLoader`]. Neither knows where bars physically come from, so
//! CSV files, fixtures and synthetic data are interchangeable.

use crate::domain::{MarketEvent, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw OHLCV bar for one symbol, as read from its native series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

impl RawBar {
    /// Snapshot this bar as a market event stamped at `timestamp`.
    ///
    /// `timestamp` differs from `self.timestamp` when the bar was forward-filled
    /// onto a later calendar entry.
    pub fn to_event(&self, symbol: &str, timestamp: Timestamp) -> MarketEvent {
        MarketEvent::new(
            timestamp,
            symbol,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        )
    }
}

/// Structured error types for data construction.
///
/// All of them are fatal to a run: a source that cannot be built never
/// produces a partial calendar.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read series for '{symbol}': {reason}")]
    Unreadable { symbol: String, reason: String },

    #[error("series for '{symbol}' is empty")]
    EmptySeries { symbol: String },

    #[error("series for '{symbol}' has more than one bar at {timestamp}")]
    DuplicateTimestamp { symbol: String, timestamp: Timestamp },

    #[error("symbol '{symbol}' is provided by more than one source")]
    DuplicateSymbol { symbol: String },

    #[error("no symbols to replay")]
    NoSymbols,

    #[error("unknown symbol '{symbol}'")]
    UnknownSymbol { symbol: String },
}

/// Anything that can hand over the native bars of one symbol.
pub trait SeriesLoader {
    fn load(&self, symbol: &str) -> Result<Vec<RawBar>, DataError>;
}

/// A data source the simulation driver can pull bars from.
pub trait DataHandler {
    /// Produce the next bar of every symbol that still has data at the
    /// current tick. Empty when nothing is available.
    fn next_bars(&mut self) -> Vec<MarketEvent>;

    /// All symbols this source serves, in replay order.
    fn symbol_list(&self) -> Vec<String>;

    /// Timestamp of the next tick to be produced, `None` once every symbol is
    /// exhausted.
    fn current_tick(&self) -> Option<Timestamp>;

    /// Skip every tick strictly before `start`.
    fn advance_to(&mut self, start: Timestamp);
}

impl<D: DataHandler + ?Sized> DataHandler for Box<D> {
    fn next_bars(&mut self) -> Vec<MarketEvent> {
        (**self).next_bars()
    }

    fn symbol_list(&self) -> Vec<String> {
        (**self).symbol_list()
    }

    fn current_tick(&self) -> Option<Timestamp> {
        (**self).current_tick()
    }

    fn advance_to(&mut self, start: Timestamp) {
        (**self).advance_to(start)
    }
}
