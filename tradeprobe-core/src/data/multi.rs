//! Several data handlers behind one.
//!
//! Each tick, only the sources sitting on the earliest pending timestamp are
//! asked for bars, so sources with different calendars interleave in time
//! order and never run ahead of each other.

use super::provider::{DataError, DataHandler};
use crate::domain::{MarketEvent, Timestamp};
use std::collections::BTreeSet;

pub struct MultiSource {
    sources: Vec<Box<dyn DataHandler>>,
}

impl MultiSource {
    /// Combine `sources`. A symbol may belong to one source only.
    pub fn new(sources: Vec<Box<dyn DataHandler>>) -> Result<Self, DataError> {
        if sources.is_empty() {
            return Err(DataError::NoSymbols);
        }
        let mut seen = BTreeSet::new();
        for source in &sources {
            for symbol in source.symbol_list() {
                if !seen.insert(symbol.clone()) {
                    return Err(DataError::DuplicateSymbol { symbol });
                }
            }
        }
        Ok(Self { sources })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl DataHandler for MultiSource {
    fn next_bars(&mut self) -> Vec<MarketEvent> {
        let Some(now) = self.current_tick() else {
            return Vec::new();
        };
        let mut bars = Vec::new();
        for source in &mut self.sources {
            if source.current_tick() == Some(now) {
                bars.extend(source.next_bars());
            }
        }
        bars
    }

    fn symbol_list(&self) -> Vec<String> {
        self.sources.iter().flat_map(|s| s.symbol_list()).collect()
    }

    fn current_tick(&self) -> Option<Timestamp> {
        self.sources.iter().filter_map(|s| s.current_tick()).min()
    }

    fn advance_to(&mut self, start: Timestamp) {
        for source in &mut self.sources {
            source.advance_to(start);
        }
    }
}
