//! JSON configuration for the `candle_lab` binary

use candle_charts::ChartStyle;
use chrono::NaiveTime;
use minute_data::features::DEFAULT_EMA_SPAN;
use minute_data::{DataError, SessionRule, StockOptions, SymbolDirectory};
use move_embed::SkipGramConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or applying a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Trading session as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session open, e.g. `"09:15:00"`
    pub open: NaiveTime,
    /// Session length in minutes
    pub minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let rule = SessionRule::default();
        Self {
            open: rule.open(),
            minutes: rule.minutes(),
        }
    }
}

impl SessionConfig {
    /// Validated session rule
    pub fn rule(&self) -> Result<SessionRule, ConfigError> {
        Ok(SessionRule::new(self.open, self.minutes)?)
    }
}

/// Settings shared by every subcommand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub session: SessionConfig,
    /// Drop days that do not cover the whole session on load
    pub remove_incomplete_days: bool,
    /// CSV with `SYMBOL` and `NAME OF COMPANY` columns
    pub equity_list: Option<PathBuf>,
    pub ema_span: usize,
    /// Movements per training sentence
    pub sequence_length: usize,
    pub embedding: SkipGramConfig,
    pub chart: ChartStyle,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            remove_incomplete_days: true,
            equity_list: None,
            ema_span: DEFAULT_EMA_SPAN,
            sequence_length: 10,
            embedding: SkipGramConfig::default(),
            chart: ChartStyle::default(),
        }
    }
}

impl LabConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&text)?;
        log::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Read `path` when given, otherwise use the defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Options for building a `Stock`, loading the equity list if one is set
    pub fn stock_options(&self) -> Result<StockOptions, ConfigError> {
        let directory = match &self.equity_list {
            Some(path) => Some(SymbolDirectory::from_csv(path)?),
            None => None,
        };

        Ok(StockOptions {
            rule: self.session.rule()?,
            remove_incomplete_days: self.remove_incomplete_days,
            directory,
        })
    }
}
