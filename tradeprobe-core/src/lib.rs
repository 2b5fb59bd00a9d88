//! TradeProbe Core: event model, event bus, data replay and simulation clock.
//!
//! This crate contains the heart of the backtesting engine:
//! - Event types (market bars, signals, orders, fills, drained sentinel)
//! - A shared publish/subscribe bus with per-tick drain
//! - Multi-symbol calendar alignment with forward-fill and cursor replay
//! - The simulation driver that advances time in lockstep with the data
//!
//! Strategies, portfolios and brokers live outside the core; they plug in
//! through the [`engine::Observer`] trait.

pub mod data;
pub mod domain;
pub mod engine;
