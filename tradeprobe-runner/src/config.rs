//! Serializable run configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tradeprobe_core::domain::Timestamp;
use tradeprobe_core::engine::DispatchMode;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("start {start} must be before end {end}")]
    InvalidWindow { start: Timestamp, end: Timestamp },

    #[error("at least one symbol is required")]
    NoSymbols,

    #[error("symbol '{0}' is listed more than once")]
    DuplicateSymbol(String),

    #[error("initial capital must be positive, got {0}")]
    NonPositiveCapital(f64),

    #[error("order quantity must not be negative, got {0}")]
    NegativeQuantity(i64),

    #[error("{field} must be a non-negative number, got {value}")]
    NegativeCommission { field: &'static str, value: f64 },
}

/// Everything needed to reproduce one run.
///
/// ```toml
/// start = "2022-06-15"
/// end = "2022-06-17"
/// symbols = ["AAPL", "META"]
/// data_dir = "data"
/// dispatch = "sequential"
///
/// [portfolio]
/// initial_capital = 100000.0
/// order_quantity = 100
///
/// [broker]
/// commission_per_share = 0.005
/// min_commission = 1.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// First tick considered (inclusive).
    #[serde(with = "timestamp_format")]
    pub start: Timestamp,

    /// Run boundary (exclusive).
    #[serde(with = "timestamp_format")]
    pub end: Timestamp,

    pub symbols: Vec<String>,

    /// Directory holding one `<SYMBOL>.csv` per symbol.
    pub data_dir: PathBuf,

    #[serde(default)]
    pub dispatch: DispatchMode,

    #[serde(default)]
    pub portfolio: PortfolioConfig,

    #[serde(default)]
    pub broker: BrokerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PortfolioConfig {
    pub initial_capital: f64,
    /// Shares per order, regardless of price or cash.
    pub order_quantity: i64,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            order_quantity: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    pub commission_per_share: f64,
    /// Floor applied to every non-empty fill.
    pub min_commission: f64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            commission_per_share: 0.005,
            min_commission: 1.0,
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML config file. Relative `data_dir` paths are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if config.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.data_dir = parent.join(&config.data_dir);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start >= self.end {
            return Err(ConfigError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        if self.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        for (i, symbol) in self.symbols.iter().enumerate() {
            if self.symbols[..i].contains(symbol) {
                return Err(ConfigError::DuplicateSymbol(symbol.clone()));
            }
        }
        let capital = self.portfolio.initial_capital;
        if capital.is_nan() || capital <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(capital));
        }
        if self.portfolio.order_quantity < 0 {
            return Err(ConfigError::NegativeQuantity(self.portfolio.order_quantity));
        }
        for (field, value) in [
            ("commission_per_share", self.broker.commission_per_share),
            ("min_commission", self.broker.min_commission),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::NegativeCommission { field, value });
            }
        }
        Ok(())
    }

    /// Deterministic hash of this configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    let s = s.trim();
    chrono::NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

mod timestamp_format {
    use super::{parse_timestamp, DATE_TIME_FORMAT};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use tradeprobe_core::domain::Timestamp;

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format(DATE_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_timestamp(&s).ok_or_else(|| {
            de::Error::custom(format!(
                "'{s}' is not a date (YYYY-MM-DD) or date-time (YYYY-MM-DD HH:MM:SS)"
            ))
        })
    }
}
