//! Run several strategy configurations over the same series.
//!
//! Each run owns its portfolio, so configurations are independent and can be
//! evaluated in parallel. Results keep the input order.

use rayon::prelude::*;
use tracing::info;

use crate::domain::backtest::{BacktestResult, run_backtest};
use crate::domain::error::LrsError;
use crate::domain::price::PriceSeries;
use crate::domain::strategy::StrategyConfig;

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub results: Vec<BacktestResult>,
}

impl SweepReport {
    /// Highest total return; the earliest configuration wins ties.
    pub fn winner(&self) -> Option<&BacktestResult> {
        self.results.iter().fold(None, |best: Option<&BacktestResult>, r| match best {
            Some(b) if b.total_return_pct >= r.total_return_pct => Some(b),
            _ => Some(r),
        })
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

pub fn run_sweep(
    signal: &PriceSeries,
    tradable: &PriceSeries,
    strategies: &[StrategyConfig],
    initial_capital: f64,
    parallel: bool,
) -> Result<SweepReport, LrsError> {
    info!(
        configs = strategies.len(),
        parallel,
        "running {} over {}",
        tradable.name(),
        signal.name()
    );

    let results = if parallel {
        strategies
            .par_iter()
            .map(|s| run_backtest(signal, tradable, s, initial_capital))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        strategies
            .iter()
            .map(|s| run_backtest(signal, tradable, s, initial_capital))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(SweepReport { results })
}
