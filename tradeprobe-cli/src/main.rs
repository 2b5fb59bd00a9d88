//! TradeProbe CLI: run and check commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file
//! - `check`: validate a config and align its data without running

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tradeprobe_runner::{check, run_backtest, CheckReport, CsvSeriesLoader, RunConfig, RunReport};

#[derive(Parser)]
#[command(
    name = "tradeprobe",
    about = "TradeProbe CLI: discrete-event backtesting engine"
)]
struct Cli {
    /// Log per-tick detail (overridden by RUST_LOG).
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Print the full report as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Validate a config file and align its data without running.
    Check {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Print the check report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { config, json } => run_cmd(&config, json),
        Commands::Check { config, json } => check_cmd(&config, json),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<RunConfig> {
    let config =
        RunConfig::load(path).with_context(|| format!("loading config {}", path.display()))?;
    tracing::debug!(path = %path.display(), data_dir = %config.data_dir.display(), "config loaded");
    Ok(config)
}

fn run_cmd(config_path: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let loader = CsvSeriesLoader::new(&config.data_dir);
    let report = run_backtest(&config, &loader)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn check_cmd(config_path: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let loader = CsvSeriesLoader::new(&config.data_dir);
    let report = check(&config, &loader)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_check(&report);
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    let s = &report.summary;
    let p = &report.portfolio;

    println!();
    println!("=== Run Result ===");
    println!("Run id:         {}", report.run_id);
    println!("Symbols:        {}", report.symbols.join(", "));
    println!("Window:         {} to {} (exclusive)", s.start, s.end);
    println!("Calendar:       {} ticks", report.calendar_len);
    println!("Processed:      {} ticks", s.ticks_processed);
    println!("Events:         {}", s.events_dispatched);
    println!("Final clock:    {}", s.final_clock);
    println!("Termination:    {:?}", s.reason);
    println!();
    println!("--- Portfolio ---");
    println!("Initial:        {:.2}", p.initial_capital);
    println!("Cash:           {:.2}", p.cash);
    println!("Market value:   {:.2}", p.market_value);
    println!("Equity:         {:.2}", p.equity);
    println!("Commission:     {:.2}", p.commission_paid);
    println!("Signals:        {}", report.signals_sent);
    println!("Orders/Fills:   {}/{}", p.orders_sent, p.fills_received);
    for (symbol, qty) in &p.positions {
        println!("  {symbol:<12} {qty:>10}");
    }
}

fn print_check(report: &CheckReport) {
    println!("Run id:         {}", report.run_id);
    match (report.first, report.last) {
        (Some(first), Some(last)) => println!(
            "Calendar:       {} ticks, {first} to {last}",
            report.calendar_len
        ),
        _ => println!("Calendar:       empty"),
    }
    for coverage in &report.symbols {
        println!(
            "  {:<12} forward-filled {}",
            coverage.symbol, coverage.forward_filled
        );
    }
    println!("OK");
}
