//! Multi-symbol time alignment.
//!
//! Given native bars for multiple symbols, align them to a common calendar:
//! the sorted union of every symbol's timestamps. A symbol missing a calendar
//! entry takes its most recent earlier bar (forward-fill). Entries before a
//! symbol's first native bar stay empty.

use super::provider::{DataError, RawBar};
use crate::domain::Timestamp;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One symbol's bars laid out on the shared calendar.
#[derive(Debug, Clone)]
pub struct AlignedSeries {
    pub symbol: String,
    /// Same length as the calendar. `None` before the first native bar.
    pub bars: Vec<Option<RawBar>>,
    /// Number of entries filled from an earlier bar.
    pub forward_filled: usize,
}

impl AlignedSeries {
    /// Calendar index of the first native bar.
    pub fn first_index(&self) -> Option<usize> {
        self.bars.iter().position(Option::is_some)
    }
}

/// Bar data for multiple symbols on a common calendar.
#[derive(Debug, Clone)]
pub struct AlignedData {
    /// The common time axis, sorted ascending, shared read-only.
    pub calendar: Arc<[Timestamp]>,
    /// Per-symbol series, sorted by symbol.
    pub series: Vec<AlignedSeries>,
}

impl AlignedData {
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.symbol.as_str())
    }
}

/// Align multiple symbols to a common calendar with forward-fill.
///
/// Each series is sorted first. Empty series and duplicate timestamps within
/// one series are construction errors.
pub fn align_symbols(symbol_bars: BTreeMap<String, Vec<RawBar>>) -> Result<AlignedData, DataError> {
    if symbol_bars.is_empty() {
        return Err(DataError::NoSymbols);
    }

    let mut sorted: BTreeMap<String, Vec<RawBar>> = BTreeMap::new();
    let mut all_timestamps = BTreeSet::new();
    for (symbol, mut bars) in symbol_bars {
        if bars.is_empty() {
            return Err(DataError::EmptySeries { symbol });
        }
        bars.sort_by_key(|b| b.timestamp);
        if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(DataError::DuplicateTimestamp {
                timestamp: pair[0].timestamp,
                symbol,
            });
        }
        all_timestamps.extend(bars.iter().map(|b| b.timestamp));
        sorted.insert(symbol, bars);
    }
    let calendar: Arc<[Timestamp]> = all_timestamps.into_iter().collect();

    let series = sorted
        .into_iter()
        .map(|(symbol, bars)| forward_fill(symbol, &bars, &calendar))
        .collect();

    Ok(AlignedData { calendar, series })
}

/// Reindex sorted `bars` onto `calendar`, padding gaps with the last seen bar.
fn forward_fill(symbol: String, bars: &[RawBar], calendar: &[Timestamp]) -> AlignedSeries {
    let mut aligned = Vec::with_capacity(calendar.len());
    let mut native = bars.iter().peekable();
    let mut last: Option<&RawBar> = None;
    let mut forward_filled = 0;

    for ts in calendar {
        if native.peek().is_some_and(|bar| bar.timestamp == *ts) {
            last = native.next();
        } else if last.is_some() {
            forward_filled += 1;
        }
        aligned.push(last.cloned());
    }

    AlignedSeries {
        symbol,
        bars: aligned,
        forward_filled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(date: &str) -> Timestamp {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(date: &str, close: f64) -> RawBar {
        RawBar {
            timestamp: ts(date),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            adj_close: close,
            volume: 1000,
        }
    }

    #[test]
    fn align_forward_fills_missing_entries() {
        let mut input = BTreeMap::new();
        input.insert(
            "SPY".to_string(),
            vec![
                bar("2024-01-02", 100.0),
                bar("2024-01-03", 101.0),
                bar("2024-01-04", 102.0),
            ],
        );
        input.insert(
            "QQQ".to_string(),
            vec![
                bar("2024-01-02", 200.0),
                // QQQ missing 2024-01-03
                bar("2024-01-04", 202.0),
            ],
        );

        let aligned = align_symbols(input).unwrap();

        assert_eq!(aligned.calendar.len(), 3);
        let qqq = &aligned.series[0];
        assert_eq!(qqq.symbol, "QQQ");
        assert_eq!(qqq.bars.len(), 3);
        // 2024-01-03 carries the 2024-01-02 close
        assert_eq!(qqq.bars[1].as_ref().unwrap().close, 200.0);
        assert_eq!(qqq.bars[2].as_ref().unwrap().close, 202.0);
        assert_eq!(qqq.forward_filled, 1);

        let spy = &aligned.series[1];
        assert_eq!(spy.bars[1].as_ref().unwrap().close, 101.0);
        assert_eq!(spy.forward_filled, 0);
    }

    #[test]
    fn late_starting_symbol_is_empty_before_first_bar() {
        let mut input = BTreeMap::new();
        input.insert(
            "OLD".to_string(),
            vec![bar("2024-01-02", 10.0), bar("2024-01-03", 11.0)],
        );
        input.insert("NEW".to_string(), vec![bar("2024-01-03", 50.0)]);

        let aligned = align_symbols(input).unwrap();
        let new = &aligned.series[0];
        assert!(new.bars[0].is_none());
        assert_eq!(new.first_index(), Some(1));
        assert_eq!(new.forward_filled, 0);
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let mut input = BTreeMap::new();
        input.insert(
            "SPY".to_string(),
            vec![bar("2024-01-04", 102.0), bar("2024-01-02", 100.0)],
        );
        let aligned = align_symbols(input).unwrap();
        assert_eq!(aligned.calendar[0], ts("2024-01-02"));
        assert_eq!(aligned.series[0].bars[0].as_ref().unwrap().close, 100.0);
    }

    #[test]
    fn trailing_entries_are_padded() {
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), vec![bar("2024-01-02", 1.0)]);
        input.insert(
            "B".to_string(),
            vec![bar("2024-01-02", 2.0), bar("2024-01-05", 3.0)],
        );
        let aligned = align_symbols(input).unwrap();
        let a = &aligned.series[0];
        assert_eq!(a.bars[1].as_ref().unwrap().close, 1.0);
        assert_eq!(a.forward_filled, 1);
    }

    #[test]
    fn empty_series_is_rejected() {
        let mut input = BTreeMap::new();
        input.insert("SPY".to_string(), vec![]);
        assert!(matches!(
            align_symbols(input),
            Err(DataError::EmptySeries { symbol }) if symbol == "SPY"
        ));
    }

    #[test]
    fn duplicate_timestamp_is_rejected() {
        let mut input = BTreeMap::new();
        input.insert(
            "SPY".to_string(),
            vec![bar("2024-01-02", 100.0), bar("2024-01-02", 100.5)],
        );
        assert!(matches!(
            align_symbols(input),
            Err(DataError::DuplicateTimestamp { .. })
        ));
    }

    #[test]
    fn no_symbols_is_rejected() {
        assert!(matches!(
            align_symbols(BTreeMap::new()),
            Err(DataError::NoSymbols)
        ));
    }
}
