//! Backtest engine and event loop.
//!
//! The signal and tradable series are joined on their common dates first;
//! the moving average, thresholds and replay all run over that join. Days
//! present in only one series never reach the engine.

use chrono::NaiveDate;
use std::cmp::Ordering;
use tracing::debug;

use crate::domain::error::LrsError;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::{EquityPoint, Portfolio};
use crate::domain::position::Trade;
use crate::domain::price::PriceSeries;
use crate::domain::signal::{SignalLevels, compute_thresholds};
use crate::domain::strategy::StrategyConfig;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;

/// One joined trading day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketDay {
    pub date: NaiveDate,
    pub signal_close: f64,
    pub tradable_close: f64,
    pub levels: Option<SignalLevels>,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: StrategyConfig,
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return_pct: f64,
    pub cagr_pct: f64,
    pub max_drawdown_pct: f64,
    pub years: f64,
    pub num_trades: usize,
    pub win_rate_pct: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    /// Still holding shares on the last day (marked to market, not sold).
    pub open_position: bool,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestResult {
    fn from_run(strategy: &StrategyConfig, portfolio: Portfolio, final_value: f64) -> Self {
        let metrics = Metrics::compute(
            &portfolio.trades,
            &portfolio.equity_curve,
            portfolio.initial_capital,
            final_value,
        );
        BacktestResult {
            strategy: strategy.clone(),
            initial_capital: portfolio.initial_capital,
            final_value,
            total_return_pct: metrics.total_return_pct,
            cagr_pct: metrics.cagr_pct,
            max_drawdown_pct: metrics.max_drawdown_pct,
            years: metrics.years,
            num_trades: metrics.num_trades,
            win_rate_pct: metrics.win_rate_pct,
            avg_win_pct: metrics.avg_win_pct,
            avg_loss_pct: metrics.avg_loss_pct,
            open_position: portfolio.is_invested(),
            trades: portfolio.trades,
            equity_curve: portfolio.equity_curve,
        }
    }
}

/// Join two series on the dates they share, in ascending order.
pub fn align_days(signal: &PriceSeries, tradable: &PriceSeries) -> Vec<(NaiveDate, f64, f64)> {
    let (a, b) = (signal.points(), tradable.points());
    let mut joined = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].date.cmp(&b[j].date) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                joined.push((a[i].date, a[i].close, b[j].close));
                i += 1;
                j += 1;
            }
        }
    }
    joined
}

/// Joined days with their signal levels for `strategy`.
pub fn build_market_days(
    signal: &PriceSeries,
    tradable: &PriceSeries,
    strategy: &StrategyConfig,
) -> Result<Vec<MarketDay>, LrsError> {
    let joined = align_days(signal, tradable);
    if joined.is_empty() {
        let (from, to) = outer_range(signal, tradable);
        return Err(LrsError::DataAlignment {
            reason: format!(
                "{} and {} share no trading dates",
                signal.name(),
                tradable.name()
            ),
            from,
            to,
        });
    }
    if joined.len() < strategy.ma_window {
        return Err(LrsError::InsufficientHistory {
            what: format!("{} moving average over {}", strategy.ma_window, signal.name()),
            have: joined.len(),
            need: strategy.ma_window,
        });
    }

    let joined_signal = PriceSeries::from_pairs(
        signal.name(),
        joined.iter().map(|&(date, close, _)| (date, close)),
    )?;
    let moving_average = calculate_sma(&joined_signal, strategy.ma_window);
    let thresholds = compute_thresholds(&moving_average, strategy.buy_buffer, strategy.sell_buffer);

    joined
        .into_iter()
        .zip(thresholds)
        .map(|((date, signal_close, tradable_close), t)| {
            if t.date != date {
                return Err(LrsError::DataAlignment {
                    reason: format!("threshold dated {} joined to market day {}", t.date, date),
                    from: date.min(t.date),
                    to: date.max(t.date),
                });
            }
            Ok(MarketDay {
                date,
                signal_close,
                tradable_close,
                levels: t.levels,
            })
        })
        .collect()
}

fn outer_range(a: &PriceSeries, b: &PriceSeries) -> (NaiveDate, NaiveDate) {
    let ranges = [a.date_range(), b.date_range()];
    let from = ranges.iter().flatten().map(|r| r.0).min();
    let to = ranges.iter().flatten().map(|r| r.1).max();
    (from.unwrap_or(NaiveDate::MIN), to.unwrap_or(NaiveDate::MAX))
}

/// Replay prepared market days through the CASH/INVESTED state machine.
pub fn replay(
    days: &[MarketDay],
    strategy: &StrategyConfig,
    initial_capital: f64,
) -> Result<BacktestResult, LrsError> {
    let mut portfolio = Portfolio::new(initial_capital);

    for day in days {
        let Some(levels) = day.levels else {
            portfolio.record_equity(day.date, portfolio.market_value(day.tradable_close));
            continue;
        };

        if !portfolio.is_invested() && levels.is_buy(day.signal_close) {
            let trade = portfolio.buy(day.date, day.signal_close, &levels, day.tradable_close)?;
            debug!(date = %trade.date, price = trade.instrument_price, "BUY");
        } else if portfolio.is_invested() && levels.is_sell(day.signal_close) {
            let trade = portfolio.sell(day.date, day.signal_close, &levels, day.tradable_close)?;
            debug!(
                date = %trade.date,
                price = trade.instrument_price,
                pnl = ?trade.pnl_pct,
                "SELL"
            );
        }

        portfolio.record_equity(day.date, portfolio.market_value(day.tradable_close));
    }

    let final_value = match days.last() {
        Some(last) => portfolio.market_value(last.tradable_close),
        None => portfolio.cash,
    };
    Ok(BacktestResult::from_run(strategy, portfolio, final_value))
}

/// Run one strategy over a signal/tradable pair.
pub fn run_backtest(
    signal: &PriceSeries,
    tradable: &PriceSeries,
    strategy: &StrategyConfig,
    initial_capital: f64,
) -> Result<BacktestResult, LrsError> {
    strategy.validate()?;
    let days = build_market_days(signal, tradable, strategy)?;
    replay(&days, strategy, initial_capital)
}
