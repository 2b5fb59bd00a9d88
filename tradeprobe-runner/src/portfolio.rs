//! Naive portfolio: turns every signal into a fixed-size order and books
//! fills into positions and cash.
//!
//! No sizing, no risk checks, no cash constraint. Good enough to exercise a
//! full signal -> order -> fill round trip.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tradeprobe_core::domain::{Direction, Event, OrderEvent, SignalType};
use tradeprobe_core::engine::{EventBus, HandlerError, Observer};

use crate::config::PortfolioConfig;

/// Point-in-time view of the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    pub initial_capital: f64,
    pub cash: f64,
    /// Net shares per symbol; short positions are negative.
    pub positions: BTreeMap<String, i64>,
    /// Positions valued at the last close seen for each symbol.
    pub market_value: f64,
    pub equity: f64,
    pub commission_paid: f64,
    pub orders_sent: usize,
    pub fills_received: usize,
}

pub struct NaivePortfolio {
    bus: Arc<EventBus>,
    initial_capital: f64,
    order_quantity: i64,
    cash: f64,
    positions: BTreeMap<String, i64>,
    last_close: BTreeMap<String, f64>,
    commission_paid: f64,
    orders_sent: usize,
    fills_received: usize,
}

impl NaivePortfolio {
    pub fn new(bus: Arc<EventBus>, config: &PortfolioConfig) -> Self {
        Self {
            bus,
            initial_capital: config.initial_capital,
            order_quantity: config.order_quantity,
            cash: config.initial_capital,
            positions: BTreeMap::new(),
            last_close: BTreeMap::new(),
            commission_paid: 0.0,
            orders_sent: 0,
            fills_received: 0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> PortfolioSnapshot {
        let market_value: f64 = self
            .positions
            .iter()
            .map(|(symbol, &qty)| {
                qty as f64 * self.last_close.get(symbol).copied().unwrap_or(0.0)
            })
            .sum();
        PortfolioSnapshot {
            initial_capital: self.initial_capital,
            cash: self.cash,
            positions: self.positions.clone(),
            market_value,
            equity: self.cash + market_value,
            commission_paid: self.commission_paid,
            orders_sent: self.orders_sent,
            fills_received: self.fills_received,
        }
    }
}

impl Observer for NaivePortfolio {
    fn handle(&mut self, event: &Event) -> Result<(), HandlerError> {
        match event {
            Event::Market(bar) if !bar.is_void() => {
                self.last_close.insert(bar.symbol.clone(), bar.close);
            }
            Event::Signal(signal) => {
                let direction = match signal.signal_type {
                    SignalType::Long => Direction::Buy,
                    SignalType::Short => Direction::Sell,
                };
                let order = OrderEvent::new(
                    signal.timestamp,
                    &signal.symbol,
                    self.order_quantity,
                    direction,
                )?;
                self.bus.publish(order)?;
                self.orders_sent += 1;
            }
            Event::Fill(fill) => {
                *self.positions.entry(fill.symbol().to_string()).or_insert(0) +=
                    fill.direction().sign() * fill.quantity();
                self.cash += fill.cash_delta();
                self.commission_paid += fill.commission();
                self.fills_received += 1;
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "naive_portfolio"
    }
}
