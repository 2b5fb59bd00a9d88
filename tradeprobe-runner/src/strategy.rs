//! Buy-and-hold: go long every symbol on its first usable bar, then stay put.

use std::collections::BTreeSet;
use std::sync::Arc;
use tradeprobe_core::domain::{Event, SignalEvent, SignalType};
use tradeprobe_core::engine::{EventBus, HandlerError, Observer};

pub struct BuyAndHoldStrategy {
    bus: Arc<EventBus>,
    bought: BTreeSet<String>,
}

impl BuyAndHoldStrategy {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            bought: BTreeSet::new(),
        }
    }

    /// Symbols a long signal has been emitted for.
    pub fn bought(&self) -> impl Iterator<Item = &str> {
        self.bought.iter().map(String::as_str)
    }

    pub fn signals_sent(&self) -> usize {
        self.bought.len()
    }
}

impl Observer for BuyAndHoldStrategy {
    fn handle(&mut self, event: &Event) -> Result<(), HandlerError> {
        let Event::Market(bar) = event else {
            return Ok(());
        };
        // Void bars carry no price to act on.
        if bar.is_void() || self.bought.contains(&bar.symbol) {
            return Ok(());
        }
        self.bus
            .publish(SignalEvent::new(bar.timestamp, &bar.symbol, SignalType::Long))?;
        self.bought.insert(bar.symbol.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "buy_and_hold"
    }
}
