//! SignalEvent: a strategy's directional view on one symbol.

use super::Timestamp;
use serde::Serialize;

/// Direction a strategy wants to be positioned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    Long,
    Short,
}

/// Strategy output, consumed by the portfolio to decide trades.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalEvent {
    pub timestamp: Timestamp,
    pub symbol: String,
    pub signal_type: SignalType,
}

impl SignalEvent {
    pub fn new(timestamp: Timestamp, symbol: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            signal_type,
        }
    }
}
