//! Synthetic leveraged price history.
//!
//! The simulated leveraged return of every underlying day is compounded from
//! a base of 1.0, then the whole curve is scaled so that it equals the real
//! leveraged close on the real series' first date (the anchor). Dates before
//! the cutover come from the scaled curve, dates from the cutover on come
//! from the real series verbatim.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::domain::drag::DragModel;
use crate::domain::error::LrsError;
use crate::domain::price::{PricePoint, PriceSeries, RateSeries};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticBuilder {
    pub model: DragModel,
    pub spread: f64,
    /// First date taken from the real series. Defaults to its first date.
    pub cutover: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct SyntheticSeries {
    /// Synthetic history before the cutover, real data after.
    pub spliced: PriceSeries,
    /// The scaled synthetic curve over every underlying date, unspliced.
    pub synthetic: PriceSeries,
    pub anchor: NaiveDate,
    pub cutover: NaiveDate,
    pub scale: f64,
    pub spread: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingStats {
    pub days: usize,
    /// synthetic / real on the last common date.
    pub final_ratio: f64,
    pub max_abs_deviation_pct: f64,
}

impl SyntheticBuilder {
    pub fn new(model: DragModel, spread: f64) -> Self {
        SyntheticBuilder {
            model,
            spread,
            cutover: None,
        }
    }

    pub fn with_cutover(mut self, cutover: NaiveDate) -> Self {
        self.cutover = Some(cutover);
        self
    }

    pub fn build(
        &self,
        underlying: &PriceSeries,
        leveraged: &PriceSeries,
        rates: &RateSeries,
    ) -> Result<SyntheticSeries, LrsError> {
        self.model.validate()?;

        let (anchor, real_last) = leveraged
            .date_range()
            .ok_or_else(|| LrsError::InsufficientHistory {
                what: format!("splice anchor in {}", leveraged.name()),
                have: 0,
                need: 1,
            })?;
        let anchor_close = leveraged.points()[0].close;

        let anchor_index = underlying.index_of(anchor).ok_or_else(|| LrsError::DataAlignment {
            reason: format!(
                "{} first date is not a {} trading date",
                leveraged.name(),
                underlying.name()
            ),
            from: anchor,
            to: anchor,
        })?;

        let cutover = self.cutover.unwrap_or(anchor);
        if cutover < anchor || cutover > real_last || leveraged.index_of(cutover).is_none() {
            return Err(LrsError::DataAlignment {
                reason: format!(
                    "cutover {} must be a {} trading date within its history",
                    cutover,
                    leveraged.name()
                ),
                from: anchor,
                to: real_last,
            });
        }

        let cumulative = self.cumulative_curve(underlying, rates)?;
        let scale = anchor_close / cumulative[anchor_index];
        debug!(anchor = %anchor, scale, "anchoring synthetic curve");

        let scaled: Vec<PricePoint> = underlying
            .points()
            .iter()
            .zip(&cumulative)
            .map(|(p, &factor)| PricePoint {
                date: p.date,
                close: factor * scale,
            })
            .collect();
        let synthetic_name = format!("{}-synthetic", leveraged.name());

        let spliced_points: Vec<PricePoint> = scaled
            .iter()
            .take_while(|p| p.date < cutover)
            .copied()
            .chain(leveraged.points().iter().filter(|p| p.date >= cutover).copied())
            .collect();

        let synthetic = PriceSeries::new(synthetic_name, scaled)?;
        let spliced = PriceSeries::new(leveraged.name(), spliced_points)?;

        info!(
            synthetic_days = synthetic.len(),
            spliced_days = spliced.len(),
            cutover = %cutover,
            "built synthetic history"
        );

        Ok(SyntheticSeries {
            spliced,
            synthetic,
            anchor,
            cutover,
            scale,
            spread: self.spread,
        })
    }

    /// Compounded leveraged factor per underlying date, 1.0 on the first.
    fn cumulative_curve(
        &self,
        underlying: &PriceSeries,
        rates: &RateSeries,
    ) -> Result<Vec<f64>, LrsError> {
        let aligned = rates.align_to(&underlying.dates())?;
        let mut curve = Vec::with_capacity(underlying.len());
        if underlying.is_empty() {
            return Ok(curve);
        }

        let mut factor = 1.0_f64;
        curve.push(factor);
        for (r, &rate) in underlying.daily_returns().iter().zip(&aligned[1..]) {
            factor *= 1.0 + self.model.daily_return(*r, rate, self.spread);
            curve.push(factor);
        }
        Ok(curve)
    }
}

/// Compare a synthetic series with the real one over their common dates.
pub fn tracking_error(synthetic: &PriceSeries, real: &PriceSeries) -> Option<TrackingStats> {
    let mut days = 0usize;
    let mut last_ratio = None;
    let mut max_dev = 0.0_f64;
    for p in real.points() {
        if let Some(s) = synthetic.close_on(p.date) {
            let ratio = s / p.close;
            max_dev = max_dev.max((ratio - 1.0).abs() * 100.0);
            last_ratio = Some(ratio);
            days += 1;
        }
    }
    last_ratio.map(|final_ratio| TrackingStats {
        days,
        final_ratio,
        max_abs_deviation_pct: max_dev,
    })
}
