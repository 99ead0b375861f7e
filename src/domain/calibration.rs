//! Borrowing-spread calibration against a real leveraged series.
//!
//! Grid search over `[spread_min, spread_max]` for the spread whose simulated
//! cumulative factor is closest to the real one over the overlap window. The
//! candidate order is total: lower error wins, equal errors go to the lower
//! grid index. The parallel and sequential paths therefore agree exactly.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

use crate::domain::backtest::align_days;
use crate::domain::drag::DragModel;
use crate::domain::error::LrsError;
use crate::domain::price::{PriceSeries, RateSeries};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConfig {
    pub spread_min: f64,
    pub spread_max: f64,
    pub samples: usize,
    pub parallel: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        CalibrationConfig {
            spread_min: 0.0,
            spread_max: 0.05,
            samples: 501,
            parallel: true,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), LrsError> {
        if !self.spread_min.is_finite() || self.spread_min < 0.0 {
            return Err(LrsError::config_invalid(
                "synthetic",
                "spread_min",
                "spread_min must be a non-negative number",
            ));
        }
        if !self.spread_max.is_finite() || self.spread_max < self.spread_min {
            return Err(LrsError::config_invalid(
                "synthetic",
                "spread_max",
                "spread_max must be >= spread_min",
            ));
        }
        if self.samples == 0 {
            return Err(LrsError::config_invalid(
                "synthetic",
                "spread_samples",
                "spread_samples must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn candidate(&self, index: usize) -> f64 {
        if self.samples <= 1 {
            return self.spread_min;
        }
        let step = (self.spread_max - self.spread_min) / (self.samples - 1) as f64;
        self.spread_min + step * index as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadSource {
    Calibrated,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    pub spread: f64,
    pub cumulative_error: f64,
    pub simulated_factor: f64,
    pub real_factor: f64,
    pub overlap_days: usize,
    pub overlap: Option<(NaiveDate, NaiveDate)>,
    pub source: SpreadSource,
}

impl CalibrationResult {
    pub fn fallback(spread: f64) -> Self {
        CalibrationResult {
            spread,
            cumulative_error: 0.0,
            simulated_factor: f64::NAN,
            real_factor: f64::NAN,
            overlap_days: 0,
            overlap: None,
            source: SpreadSource::Fallback,
        }
    }
}

/// Underlying returns, rates and the real factor over the overlap window.
struct OverlapWindow {
    dates: Vec<NaiveDate>,
    underlying_returns: Vec<f64>,
    rates: Vec<f64>,
    real_factor: f64,
}

fn overlap_window(
    underlying: &PriceSeries,
    leveraged: &PriceSeries,
    rates: &RateSeries,
) -> Result<OverlapWindow, LrsError> {
    let joined = align_days(underlying, leveraged);
    if joined.len() < 2 {
        return Err(LrsError::InsufficientHistory {
            what: format!(
                "calibration overlap of {} and {}",
                underlying.name(),
                leveraged.name()
            ),
            have: joined.len(),
            need: 2,
        });
    }

    let overlap = PriceSeries::from_pairs(
        underlying.name(),
        joined.iter().map(|&(date, close, _)| (date, close)),
    )?;
    let dates = overlap.dates();
    let aligned = rates.align_to(&dates)?;
    let real_factor = joined[joined.len() - 1].2 / joined[0].2;

    Ok(OverlapWindow {
        // Returns start on the second overlap day; so do their rates.
        rates: aligned[1..].to_vec(),
        underlying_returns: overlap.daily_returns(),
        dates,
        real_factor,
    })
}

fn better(a: (usize, f64), b: (usize, f64)) -> (usize, f64) {
    match a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)) {
        Ordering::Greater => b,
        _ => a,
    }
}

pub fn calibrate(
    underlying: &PriceSeries,
    leveraged: &PriceSeries,
    rates: &RateSeries,
    model: &DragModel,
    config: &CalibrationConfig,
) -> Result<CalibrationResult, LrsError> {
    model.validate()?;
    config.validate()?;
    let window = overlap_window(underlying, leveraged, rates)?;

    let error_at = |index: usize| -> (usize, f64) {
        let spread = config.candidate(index);
        let simulated = model.cumulative_factor(&window.underlying_returns, &window.rates, spread);
        (index, (simulated - window.real_factor).abs())
    };

    let identity = (usize::MAX, f64::INFINITY);
    let (best_index, best_error) = if config.parallel {
        (0..config.samples)
            .into_par_iter()
            .map(error_at)
            .reduce(|| identity, better)
    } else {
        (0..config.samples).map(error_at).fold(identity, better)
    };

    let spread = config.candidate(best_index);
    let simulated_factor =
        model.cumulative_factor(&window.underlying_returns, &window.rates, spread);
    let overlap = Some((window.dates[0], window.dates[window.dates.len() - 1]));

    debug!(
        samples = config.samples,
        best_index, simulated_factor, "calibration grid evaluated"
    );
    info!(
        spread,
        error = best_error,
        days = window.dates.len(),
        "calibrated borrowing spread"
    );

    Ok(CalibrationResult {
        spread,
        cumulative_error: best_error,
        simulated_factor,
        real_factor: window.real_factor,
        overlap_days: window.dates.len(),
        overlap,
        source: SpreadSource::Calibrated,
    })
}

/// Calibrate, falling back to `default_spread` when the overlap is too short.
pub fn calibrate_or_fallback(
    underlying: &PriceSeries,
    leveraged: &PriceSeries,
    rates: &RateSeries,
    model: &DragModel,
    config: &CalibrationConfig,
    default_spread: f64,
) -> Result<CalibrationResult, LrsError> {
    match calibrate(underlying, leveraged, rates, model, config) {
        Ok(result) => Ok(result),
        Err(LrsError::InsufficientHistory { what, have, need }) => {
            warn!(
                have,
                need,
                default_spread,
                "cannot calibrate {what}; using default spread"
            );
            Ok(CalibrationResult::fallback(default_spread))
        }
        Err(e) => Err(e),
    }
}
