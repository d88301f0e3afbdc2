use std::collections::HashMap;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::order::TokenPair;

/// Main configuration struct
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Execution mode (simulation flag, engine)
    #[serde(default)]
    pub mode: ModeConfig,
    /// Stable/trade token symbols and decimals
    #[serde(default)]
    pub pair: TokenPair,
    /// Tick loop configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Strategy configuration (type, params)
    pub strategy: StrategyConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
    /// Paper engine configuration
    #[serde(default)]
    pub paper: PaperConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModeConfig {
    /// Compute fills arithmetically instead of swapping through the gateway
    #[serde(default = "default_simulation")]
    pub simulation: bool,
    /// Execution engine, only "paper" is available
    #[serde(default = "default_engine")]
    pub engine: String,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            simulation: default_simulation(),
            engine: default_engine(),
        }
    }
}

fn default_simulation() -> bool {
    true
}

fn default_engine() -> String {
    "paper".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Delay between two ticks in milliseconds
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
        }
    }
}

fn default_refresh_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Strategy type name ("grid_trading" or "scalping")
    #[serde(rename = "type")]
    pub type_name: String,
    /// Strategy-specific parameters
    #[serde(default)]
    pub params: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_initial_stable")]
    pub initial_stable: f64,
    #[serde(default)]
    pub initial_trade: f64,
    /// Percent of every swap output kept as fee
    #[serde(default)]
    pub fee_percent: f64,
    /// Price path replayed by the paper price feed
    #[serde(default)]
    pub prices: Vec<f64>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_stable: default_initial_stable(),
            initial_trade: 0.0,
            fee_percent: 0.0,
            prices: Vec::new(),
        }
    }
}

fn default_initial_stable() -> f64 {
    1000.0
}

impl Settings {
    /// Load settings from a configuration file
    pub fn new(config_path: &str) -> Result<Self> {
        Self::build(
            Config::builder()
                .add_source(File::with_name(config_path))
                // e.g. APP_RUNNER__REFRESH_MS=1000
                .add_source(env_source()),
        )
    }

    /// Load settings from an in-memory TOML document, still honouring env overrides
    pub fn from_toml(content: &str) -> Result<Self> {
        Self::build(
            Config::builder()
                .add_source(File::from_str(content, FileFormat::Toml))
                .add_source(env_source()),
        )
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the bot cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.mode.engine != "paper" {
            return Err(Error::UnsupportedMode(self.mode.engine.clone()));
        }
        if self.runner.refresh_ms == 0 {
            return Err(Error::InvalidConfig("refresh_ms must be positive".into()));
        }
        if self.paper.fee_percent < 0.0 || self.paper.fee_percent >= 100.0 {
            return Err(Error::InvalidConfig("paper fee_percent must be in [0, 100)".into()));
        }
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("APP").separator("__").try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = r#"
        [mode]
        simulation = false

        [pair]
        stable_symbol = "USDT"
        stable_decimals = 6
        trade_symbol = "WETH"
        trade_decimals = 18

        [strategy]
        type = "grid_trading"

        [strategy.params]
        rebalance = true
        grid_count = 4
        total_buy_power = 100.0
        range = { min = 1.0, max = 2.0 }

        [paper]
        initial_stable = 500.0
        prices = [1.6, 1.75, 1.5]
    "#;

    #[test]
    fn test_load_full_document() {
        let settings = Settings::from_toml(GRID).unwrap();
        assert!(!settings.mode.simulation);
        assert_eq!(settings.mode.engine, "paper");
        assert_eq!(settings.pair.trade_symbol, "WETH");
        assert_eq!(settings.runner.refresh_ms, 5000);
        assert_eq!(settings.strategy.type_name, "grid_trading");
        assert_eq!(settings.strategy.params["grid_count"], 4);
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.paper.prices, vec![1.6, 1.75, 1.5]);
        assert_eq!(settings.paper.initial_trade, 0.0);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml("[strategy]\ntype = \"scalping\"").unwrap();
        assert!(settings.mode.simulation);
        assert_eq!(settings.pair.stable_symbol, "USDC");
        assert!(settings.strategy.params.is_empty());
        assert_eq!(settings.paper.initial_stable, 1000.0);
    }

    #[test]
    fn test_rejects_unknown_engine() {
        let result = Settings::from_toml("[mode]\nengine = \"polygon\"\n[strategy]\ntype = \"scalping\"");
        assert!(matches!(result, Err(Error::UnsupportedMode(engine)) if engine == "polygon"));
    }

    #[test]
    fn test_missing_strategy() {
        assert!(matches!(Settings::from_toml("[log]\nlevel = \"debug\""), Err(Error::Config(_))));
    }
}
