//! CSV series loading.
//!
//! One file per symbol, `<dir>/<SYMBOL>.csv`, with a header row and the
//! columns `datetime, open, high, low, close, adj_close, volume`. Columns are
//! read by position; header names are not checked.

use csv::StringRecord;
use std::path::{Path, PathBuf};
use tradeprobe_core::data::{DataError, RawBar, SeriesLoader};

use crate::config::parse_timestamp;

const COLUMNS: usize = 7;

/// Loads native bars from a directory of per-symbol CSV files.
#[derive(Debug, Clone)]
pub struct CsvSeriesLoader {
    dir: PathBuf,
}

impl CsvSeriesLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl SeriesLoader for CsvSeriesLoader {
    fn load(&self, symbol: &str) -> Result<Vec<RawBar>, DataError> {
        let path = self.path_for(symbol);
        let unreadable = |reason: String| DataError::Unreadable {
            symbol: symbol.to_string(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| unreadable(format!("{}: {e}", path.display())))?;

        let mut bars = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| unreadable(e.to_string()))?;
            // +2: 1-based, after the header row
            let line = i + 2;
            let bar = parse_row(&record).map_err(|e| unreadable(format!("line {line}: {e}")))?;
            // Void rows (NaN prices) are kept; the strategy skips them.
            let event = bar.to_event(symbol, bar.timestamp);
            if !event.is_void() && !event.is_sane() {
                return Err(unreadable(format!(
                    "line {line}: inconsistent OHLC (open {}, high {}, low {}, close {})",
                    bar.open, bar.high, bar.low, bar.close
                )));
            }
            bars.push(bar);
        }
        bars.sort_by_key(|b| b.timestamp);

        tracing::debug!(symbol, bars = bars.len(), path = %path.display(), "loaded series");
        Ok(bars)
    }
}

fn parse_row(record: &StringRecord) -> Result<RawBar, String> {
    if record.len() < COLUMNS {
        return Err(format!(
            "expected {COLUMNS} columns, found {}",
            record.len()
        ));
    }
    let field = |i: usize| record.get(i).unwrap_or_default();
    let price = |i: usize, name: &str| {
        field(i)
            .parse::<f64>()
            .map_err(|e| format!("{name} '{}': {e}", field(i)))
    };

    let timestamp = parse_timestamp(field(0))
        .ok_or_else(|| format!("datetime '{}' is not a date", field(0)))?;

    Ok(RawBar {
        timestamp,
        open: price(1, "open")?,
        high: price(2, "high")?,
        low: price(3, "low")?,
        close: price(4, "close")?,
        adj_close: price(5, "adj_close")?,
        volume: parse_volume(field(6))?,
    })
}

/// Volumes are integral, but some exports write them as `123.0`.
fn parse_volume(s: &str) -> Result<u64, String> {
    if let Ok(v) = s.parse::<u64>() {
        return Ok(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
        _ => Err(format!("volume '{s}' is not a non-negative integer")),
    }
}
