//! Single-instrument portfolio state and equity tracking.
//!
//! All-in/all-out: at every day boundary either `cash` or `shares` holds the
//! whole position and the other is zero.

use chrono::NaiveDate;

use super::error::LrsError;
use super::position::{PositionState, Trade, TradeKind, pnl_pct};
use super::signal::SignalLevels;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub state: PositionState,
    pub cash: f64,
    pub shares: f64,
    pub entry_price: f64,
    pub initial_capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            state: PositionState::Cash,
            cash: initial_capital,
            shares: 0.0,
            entry_price: 0.0,
            initial_capital,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn is_invested(&self) -> bool {
        self.state == PositionState::Invested
    }

    /// Convert all cash into shares at `price`.
    pub fn buy(
        &mut self,
        date: NaiveDate,
        signal_price: f64,
        levels: &SignalLevels,
        price: f64,
    ) -> Result<&Trade, LrsError> {
        if self.state != PositionState::Cash || self.cash <= 0.0 {
            return Err(LrsError::InvalidStateTransition {
                date,
                reason: format!("buy with cash {} in state {:?}", self.cash, self.state),
            });
        }

        self.shares = self.cash / price;
        self.cash = 0.0;
        self.entry_price = price;
        self.state = PositionState::Invested;
        self.trades.push(Trade {
            date,
            kind: TradeKind::Buy,
            signal_price,
            moving_average: levels.moving_average,
            reference_level: levels.buy_level,
            instrument_price: price,
            pnl_pct: None,
        });
        Ok(&self.trades[self.trades.len() - 1])
    }

    /// Convert all shares back into cash at `price`.
    pub fn sell(
        &mut self,
        date: NaiveDate,
        signal_price: f64,
        levels: &SignalLevels,
        price: f64,
    ) -> Result<&Trade, LrsError> {
        if self.state != PositionState::Invested || self.shares <= 0.0 {
            return Err(LrsError::InvalidStateTransition {
                date,
                reason: format!("sell with {} shares in state {:?}", self.shares, self.state),
            });
        }

        self.cash = self.shares * price;
        self.shares = 0.0;
        self.state = PositionState::Cash;
        self.trades.push(Trade {
            date,
            kind: TradeKind::Sell,
            signal_price,
            moving_average: levels.moving_average,
            reference_level: levels.sell_level,
            instrument_price: price,
            pnl_pct: Some(pnl_pct(self.entry_price, price)),
        });
        Ok(&self.trades[self.trades.len() - 1])
    }

    /// Portfolio value at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        if self.shares > 0.0 {
            self.shares * price
        } else {
            self.cash
        }
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquityPoint { date, equity });
    }
}
