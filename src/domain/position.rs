//! Position state and the trade record emitted on each transition.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Cash,
    Invested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    Buy,
    Sell,
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeKind::Buy => write!(f, "BUY"),
            TradeKind::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub kind: TradeKind,
    /// Close of the signal (underlying) instrument.
    pub signal_price: f64,
    pub moving_average: f64,
    /// The level that was crossed: buy level on BUY, sell level on SELL.
    pub reference_level: f64,
    /// Close of the traded (leveraged) instrument.
    pub instrument_price: f64,
    /// Percent PnL versus the entry price; SELL only.
    pub pnl_pct: Option<f64>,
}

impl Trade {
    pub fn is_sell(&self) -> bool {
        self.kind == TradeKind::Sell
    }
}

/// (exit - entry) / entry * 100
pub fn pnl_pct(entry_price: f64, exit_price: f64) -> f64 {
    (exit_price - entry_price) / entry_price * 100.0
}
