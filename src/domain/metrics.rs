//! Performance metrics and statistics.
//!
//! All ratios are reported in percent. Years are calendar days / 365.25
//! between the first and last equity points.

use super::portfolio::EquityPoint;
use super::position::Trade;
use crate::domain::price::PriceSeries;

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return_pct: f64,
    pub cagr_pct: f64,
    /// Most negative peak-to-trough decline, <= 0.
    pub max_drawdown_pct: f64,
    pub years: f64,
    /// Completed round trips (SELL trades).
    pub num_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate_pct: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
}

impl Metrics {
    pub fn compute(
        trades: &[Trade],
        equity_curve: &[EquityPoint],
        initial_capital: f64,
        final_value: f64,
    ) -> Self {
        let total_return_pct = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };

        let years = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR,
            _ => 0.0,
        };
        let cagr_pct = annualize(initial_capital, final_value, years);

        let max_drawdown_pct = compute_max_drawdown(equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;

        for pnl in trades.iter().filter(|t| t.is_sell()).filter_map(|t| t.pnl_pct) {
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl;
            } else {
                trades_breakeven += 1;
            }
        }

        let num_trades = trades_won + trades_lost + trades_breakeven;
        let win_rate_pct = if num_trades > 0 {
            trades_won as f64 / num_trades as f64 * 100.0
        } else {
            0.0
        };

        let avg_win_pct = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        // Negative, as reported.
        let avg_loss_pct = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        Metrics {
            total_return_pct,
            cagr_pct,
            max_drawdown_pct,
            years,
            num_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate_pct,
            avg_win_pct,
            avg_loss_pct,
        }
    }
}

fn annualize(start_value: f64, end_value: f64, years: f64) -> f64 {
    if years > 0.0 && start_value > 0.0 {
        ((end_value / start_value).powf(1.0 / years) - 1.0) * 100.0
    } else {
        0.0
    }
}

fn compute_max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            let dd = (point.equity - peak) / peak * 100.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

/// Buy-and-hold benchmark on the traded instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyAndHold {
    pub total_return_pct: f64,
    pub cagr_pct: f64,
    pub years: f64,
}

impl BuyAndHold {
    /// Hold from `start_index` to the last point. `None` when the start is
    /// not before the last point.
    pub fn compute(series: &PriceSeries, start_index: usize) -> Option<Self> {
        let points = series.points();
        if start_index + 1 >= points.len() {
            return None;
        }
        let start = points[start_index];
        let end = points[points.len() - 1];
        let years = (end.date - start.date).num_days() as f64 / DAYS_PER_YEAR;
        Some(BuyAndHold {
            total_return_pct: (end.close - start.close) / start.close * 100.0,
            cagr_pct: annualize(start.close, end.close, years),
            years,
        })
    }
}
