//! OrderEvent and trade direction.

use super::event::EventError;
use super::Timestamp;
use serde::Serialize;
use std::fmt;

/// Side of an order or fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            Direction::Buy => 1,
            Direction::Sell => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// Request to trade `quantity` units of `symbol`.
///
/// Fields are private so that the non-negative quantity invariant established
/// by [`OrderEvent::new`] cannot be broken after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEvent {
    timestamp: Timestamp,
    symbol: String,
    quantity: i64,
    direction: Direction,
}

impl OrderEvent {
    pub fn new(
        timestamp: Timestamp,
        symbol: impl Into<String>,
        quantity: i64,
        direction: Direction,
    ) -> Result<Self, EventError> {
        if quantity < 0 {
            return Err(EventError::NegativeQuantity {
                kind: "order",
                quantity,
            });
        }
        Ok(Self {
            timestamp,
            symbol: symbol.into(),
            quantity,
            direction,
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
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order: Symbol={}, Quantity={}, Direction={}",
            self.symbol, self.quantity, self.direction
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> Timestamp {
        NaiveDate::from_ymd_opt(2022, 6, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let err = OrderEvent::new(ts(), "AAPL", -1, Direction::Buy).unwrap_err();
        assert!(matches!(
            err,
            EventError::NegativeQuantity {
                kind: "order",
                quantity: -1
            }
        ));
    }

    #[test]
    fn zero_quantity_is_valid() {
        let order = OrderEvent::new(ts(), "AAPL", 0, Direction::Sell).unwrap();
        assert_eq!(order.quantity(), 0);
        assert_eq!(order.direction(), Direction::Sell);
    }

    #[test]
    fn display_names_symbol_quantity_and_side() {
        let order = OrderEvent::new(ts(), "META", 10, Direction::Buy).unwrap();
        assert_eq!(
            order.to_string(),
            "Order: Symbol=META, Quantity=10, Direction=BUY"
        );
    }

    #[test]
    fn direction_sign() {
        assert_eq!(Direction::Buy.sign(), 1);
        assert_eq!(Direction::Sell.sign(), -1);
    }
}
