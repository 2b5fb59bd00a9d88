//! FillEvent: a broker's report of an executed order.

use super::event::EventError;
use super::order::Direction;
use super::Timestamp;
use serde::Serialize;

/// A filled order as reported by a broker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillEvent {
    timestamp: Timestamp,
    symbol: String,
    quantity: i64,
    direction: Direction,
    fill_price: f64,
    commission: f64,
}

impl FillEvent {
    pub fn new(
        timestamp: Timestamp,
        symbol: impl Into<String>,
        quantity: i64,
        direction: Direction,
        fill_price: f64,
        commission: f64,
    ) -> Result<Self, EventError> {
        if quantity < 0 {
            return Err(EventError::NegativeQuantity {
                kind: "fill",
                quantity,
            });
        }
        Ok(Self {
            timestamp,
            symbol: symbol.into(),
            quantity,
            direction,
            fill_price,
            commission,
        })
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn fill_price(&self) -> f64 {
        self.fill_price
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    /// Signed cash impact of the fill: negative for buys, positive for sells,
    /// always net of commission.
    pub fn cash_delta(&self) -> f64 {
        -(self.direction.sign() as f64) * self.quantity as f64 * self.fill_price - self.commission
    }
}
