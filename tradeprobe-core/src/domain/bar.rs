//! MarketEvent: one bar of one symbol, as replayed onto the bus.

use super::Timestamp;
use serde::Serialize;

/// OHLCV snapshot of a single symbol at a single calendar timestamp.
///
/// Bars produced by forward-fill carry the values of the last native bar for
/// the symbol, stamped with the calendar timestamp they were filled into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketEvent {
    pub timestamp: Timestamp,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl MarketEvent {
    pub fn new(
        timestamp: Timestamp,
        symbol: impl Into<String>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high is the top of the range, low the bottom.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}
