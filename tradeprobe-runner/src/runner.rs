//! Backtest runner: wires the bus, collaborators, replay source and driver.
//!
//! Two entry points:
//! - `run_backtest()`: load data, run to termination, report. Used by the CLI.
//! - `check()`: validate the config and align the data without running.

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use tradeprobe_core::data::{DataError, ReplaySource, SeriesLoader};
use tradeprobe_core::domain::{EventKind, Timestamp};
use tradeprobe_core::engine::{DriverError, EventBus, RunSummary, SimulationDriver};

use crate::broker::SimulatedBroker;
use crate::config::{ConfigError, RunConfig, RunId};
use crate::portfolio::{NaivePortfolio, PortfolioSnapshot};
use crate::strategy::BuyAndHoldStrategy;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("simulation error: {0}")]
    Driver(#[from] DriverError),
}

/// Complete result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub symbols: Vec<String>,
    pub calendar_len: usize,
    pub summary: RunSummary,
    pub signals_sent: usize,
    pub portfolio: PortfolioSnapshot,
}

/// What `check()` found, without running anything.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub run_id: RunId,
    pub calendar_len: usize,
    pub first: Option<Timestamp>,
    pub last: Option<Timestamp>,
    pub symbols: Vec<SymbolCoverage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolCoverage {
    pub symbol: String,
    /// Calendar entries filled from an earlier bar of this symbol.
    pub forward_filled: usize,
}

/// Run one backtest from `config`, reading series through `loader`.
pub fn run_backtest(config: &RunConfig, loader: &dyn SeriesLoader) -> Result<RunReport, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let source = ReplaySource::load(&config.symbols, loader)?;
    let symbols: Vec<String> = source.symbols().map(str::to_string).collect();
    let calendar_len = source.calendar().len();

    let bus = Arc::new(EventBus::new(config.dispatch));
    let strategy = Arc::new(Mutex::new(BuyAndHoldStrategy::new(Arc::clone(&bus))));
    let portfolio = Arc::new(Mutex::new(NaivePortfolio::new(
        Arc::clone(&bus),
        &config.portfolio,
    )));
    let broker = Arc::new(Mutex::new(SimulatedBroker::new(
        Arc::clone(&bus),
        &config.broker,
    )));

    bus.register(&strategy, EventKind::Market);
    bus.register(&portfolio, EventKind::Market);
    bus.register(&portfolio, EventKind::Signal);
    bus.register(&portfolio, EventKind::Fill);
    bus.register(&broker, EventKind::Market);
    bus.register(&broker, EventKind::Order);

    tracing::info!(%run_id, symbols = symbols.len(), calendar_len, mode = ?config.dispatch, "run configured");

    let mut driver = SimulationDriver::new(bus, source, config.start, config.end)?;
    let summary = driver.run()?;

    let signals_sent = strategy
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .signals_sent();
    let portfolio = portfolio
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .snapshot();

    Ok(RunReport {
        run_id,
        symbols,
        calendar_len,
        summary,
        signals_sent,
        portfolio,
    })
}

/// Validate `config` and align its data.
pub fn check(config: &RunConfig, loader: &dyn SeriesLoader) -> Result<CheckReport, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let source = ReplaySource::load(&config.symbols, loader)?;
    let calendar = source.calendar();

    let symbols = source
        .symbols()
        .map(|symbol| SymbolCoverage {
            symbol: symbol.to_string(),
            forward_filled: source.forward_filled(symbol).unwrap_or(0),
        })
        .collect();

    Ok(CheckReport {
        run_id,
        calendar_len: calendar.len(),
        first: calendar.first().copied(),
        last: calendar.last().copied(),
        symbols,
    })
}
