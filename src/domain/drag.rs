//! Daily cost model for a daily-rebalanced leveraged fund.
//!
//! drag   = (rate/100 + spread) * rate_multiplier / trading_days
//!          + expense_ratio / trading_days
//! return = leverage * underlying_return - drag
//!
//! `rate_multiplier` is the number of borrowed units per unit of equity
//! (2 for a 3x fund).

use crate::domain::error::LrsError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragModel {
    pub leverage: f64,
    /// Annual expense ratio as a fraction.
    pub expense_ratio: f64,
    pub trading_days: f64,
    pub rate_multiplier: f64,
}

impl Default for DragModel {
    fn default() -> Self {
        DragModel {
            leverage: 3.0,
            expense_ratio: 0.0095,
            trading_days: 252.0,
            rate_multiplier: 2.0,
        }
    }
}

impl DragModel {
    pub fn validate(&self) -> Result<(), LrsError> {
        if !self.leverage.is_finite() || self.leverage <= 0.0 {
            return Err(LrsError::config_invalid(
                "synthetic",
                "leverage",
                "leverage must be positive",
            ));
        }
        if !self.expense_ratio.is_finite() || self.expense_ratio < 0.0 {
            return Err(LrsError::config_invalid(
                "synthetic",
                "expense_ratio",
                "expense_ratio must be non-negative",
            ));
        }
        if !self.trading_days.is_finite() || self.trading_days <= 0.0 {
            return Err(LrsError::config_invalid(
                "synthetic",
                "trading_days",
                "trading_days must be positive",
            ));
        }
        if !self.rate_multiplier.is_finite() || self.rate_multiplier < 0.0 {
            return Err(LrsError::config_invalid(
                "synthetic",
                "rate_multiplier",
                "rate_multiplier must be non-negative",
            ));
        }
        Ok(())
    }

    pub fn daily_drag(&self, rate_pct: f64, spread: f64) -> f64 {
        (rate_pct / 100.0 + spread) * self.rate_multiplier / self.trading_days
            + self.expense_ratio / self.trading_days
    }

    pub fn daily_return(&self, underlying_return: f64, rate_pct: f64, spread: f64) -> f64 {
        self.leverage * underlying_return - self.daily_drag(rate_pct, spread)
    }

    /// Product of `(1 + daily_return)` over paired returns and rates.
    pub fn cumulative_factor(
        &self,
        underlying_returns: &[f64],
        rates_pct: &[f64],
        spread: f64,
    ) -> f64 {
        underlying_returns
            .iter()
            .zip(rates_pct)
            .fold(1.0, |acc, (&r, &rate)| {
                acc * (1.0 + self.daily_return(r, rate, spread))
            })
    }
}
