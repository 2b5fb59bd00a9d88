//! TradeProbe Runner: run configuration and orchestration.
//!
//! This crate builds on `tradeprobe-core` to provide:
//! - TOML run configuration with validation and content-addressed run ids
//! - A CSV series loader (one file per symbol)
//! - Reference collaborators: buy-and-hold strategy, naive portfolio,
//!   simulated broker
//! - `run_backtest()` / `check()` with serializable reports

pub mod broker;
pub mod config;
pub mod csv_loader;
pub mod portfolio;
pub mod runner;
pub mod strategy;

pub use broker::SimulatedBroker;
pub use config::{parse_timestamp, BrokerConfig, ConfigError, PortfolioConfig, RunConfig, RunId};
pub use csv_loader::CsvSeriesLoader;
pub use portfolio::{NaivePortfolio, PortfolioSnapshot};
pub use runner::{check, run_backtest, CheckReport, RunError, RunReport, SymbolCoverage};
pub use strategy::BuyAndHoldStrategy;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
    }

    #[test]
    fn reports_are_send_sync() {
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
        assert_send::<CheckReport>();
        assert_sync::<CheckReport>();
    }

    #[test]
    fn collaborators_are_send() {
        // Observers must be Send to sit behind the bus's Arc<Mutex<dyn Observer>>.
        assert_send::<BuyAndHoldStrategy>();
        assert_send::<NaivePortfolio>();
        assert_send::<SimulatedBroker>();
    }

    #[test]
    fn run_error_is_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
