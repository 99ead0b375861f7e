//! Buffered moving-average strategy configuration.

use crate::domain::error::LrsError;
use crate::domain::indicator::sma::DEFAULT_SMA_WINDOW;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub name: String,
    /// Fraction above the MA the signal must exceed to buy.
    pub buy_buffer: f64,
    /// Fraction below the MA the signal must fall under to sell.
    pub sell_buffer: f64,
    pub ma_window: usize,
}

impl StrategyConfig {
    pub fn new(name: impl Into<String>, buy_buffer: f64, sell_buffer: f64) -> Self {
        StrategyConfig {
            name: name.into(),
            buy_buffer,
            sell_buffer,
            ma_window: DEFAULT_SMA_WINDOW,
        }
    }

    pub fn with_window(mut self, ma_window: usize) -> Self {
        self.ma_window = ma_window;
        self
    }

    pub fn validate(&self) -> Result<(), LrsError> {
        let section = format!("strategy.{}", self.name);
        if !self.buy_buffer.is_finite() {
            return Err(LrsError::config_invalid(
                &section,
                "buy_buffer",
                "buy_buffer must be a number",
            ));
        }
        if !self.sell_buffer.is_finite() {
            return Err(LrsError::config_invalid(
                &section,
                "sell_buffer",
                "sell_buffer must be a number",
            ));
        }
        if self.ma_window == 0 {
            return Err(LrsError::config_invalid(
                &section,
                "ma_window",
                "ma_window must be at least 1",
            ));
        }
        Ok(())
    }
}

/// The buffer pairs compared by default, widest first.
pub fn default_presets() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::new("5% Buy / 3% Sell", 0.05, 0.03),
        StrategyConfig::new("3% Buy / 3% Sell", 0.03, 0.03),
        StrategyConfig::new("2% Buy / 2% Sell", 0.02, 0.02),
        StrategyConfig::new("1% Buy / 1% Sell", 0.01, 0.01),
        StrategyConfig::new("0.5% Buy / 0.5% Sell", 0.005, 0.005),
        StrategyConfig::new("0% Buy / 0% Sell (No Buffer)", 0.0, 0.0),
        StrategyConfig::new("3% Buy / 1% Sell", 0.03, 0.01),
    ]
}
