//! Simple Moving Average.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) points have no value.
//!
//! Computed with a sliding sum that is re-seeded from an exact window sum
//! every `n` steps, so accumulated rounding never spans more than one window.

use crate::domain::indicator::IndicatorPoint;
use crate::domain::price::PriceSeries;

pub const DEFAULT_SMA_WINDOW: usize = 200;

pub fn calculate_sma(series: &PriceSeries, period: usize) -> Vec<IndicatorPoint> {
    sma_values(&series.closes(), period)
        .into_iter()
        .zip(series.points())
        .map(|(value, p)| IndicatorPoint {
            date: p.date,
            value,
        })
        .collect()
}

pub fn sma_values(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = Vec::with_capacity(closes.len());
    if period == 0 {
        values.resize(closes.len(), None);
        return values;
    }

    let n = period as f64;
    let mut sum = 0.0_f64;
    for i in 0..closes.len() {
        if i + 1 < period {
            values.push(None);
            continue;
        }

        let start = i + 1 - period;
        if i + 1 == period || start % period == 0 {
            sum = closes[start..=i].iter().sum();
        } else {
            sum += closes[i] - closes[start - 1];
        }
        values.push(Some(sum / n));
    }
    values
}
