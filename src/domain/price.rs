//! Date-indexed closing price and short-rate series.
//!
//! Both series types are validated on construction: dates strictly
//! increasing, values finite, closes positive. Everything downstream relies
//! on these invariants instead of re-checking them.

use chrono::NaiveDate;

use super::error::LrsError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    name: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(name: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, LrsError> {
        let name = name.into();
        for (i, p) in points.iter().enumerate() {
            if !p.close.is_finite() || p.close <= 0.0 {
                return Err(LrsError::InvalidSeries {
                    name,
                    reason: format!("close {} on {} is not a positive number", p.close, p.date),
                });
            }
            if i > 0 && points[i - 1].date >= p.date {
                return Err(LrsError::InvalidSeries {
                    name,
                    reason: format!(
                        "dates not strictly increasing at {} (after {})",
                        p.date,
                        points[i - 1].date
                    ),
                });
            }
        }
        Ok(Self { name, points })
    }

    /// Convenience constructor from `(date, close)` pairs.
    pub fn from_pairs(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self, LrsError> {
        let points = pairs
            .into_iter()
            .map(|(date, close)| PricePoint { date, close })
            .collect();
        Self::new(name, points)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.points.binary_search_by_key(&date, |p| p.date).ok()
    }

    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.index_of(date).map(|i| self.points[i].close)
    }

    /// Points with `start <= date <= end`; either bound may be open.
    pub fn slice_between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> PriceSeries {
        let points = self
            .points
            .iter()
            .filter(|p| start.is_none_or(|s| p.date >= s) && end.is_none_or(|e| p.date <= e))
            .copied()
            .collect();
        PriceSeries {
            name: self.name.clone(),
            points,
        }
    }

    /// Simple daily returns; entry `i` is `close[i+1] / close[i] - 1`.
    pub fn daily_returns(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| w[1].close / w[0].close - 1.0)
            .collect()
    }

    /// First-to-last return in percent, `None` for fewer than two points.
    pub fn total_return_pct(&self) -> Option<f64> {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) if self.len() >= 2 => {
                Some((last.close / first.close - 1.0) * 100.0)
            }
            _ => None,
        }
    }

    /// `(first, last)` dates, `None` when empty.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.first()?.date, self.last()?.date))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePoint {
    pub date: NaiveDate,
    /// Annualized short-term rate in percent (5.0 means 5%).
    pub rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateSeries {
    name: String,
    points: Vec<RatePoint>,
}

impl RateSeries {
    pub fn new(name: impl Into<String>, points: Vec<RatePoint>) -> Result<Self, LrsError> {
        let name = name.into();
        for (i, p) in points.iter().enumerate() {
            if !p.rate_pct.is_finite() {
                return Err(LrsError::InvalidSeries {
                    name,
                    reason: format!("rate on {} is not finite", p.date),
                });
            }
            if i > 0 && points[i - 1].date >= p.date {
                return Err(LrsError::InvalidSeries {
                    name,
                    reason: format!(
                        "dates not strictly increasing at {} (after {})",
                        p.date,
                        points[i - 1].date
                    ),
                });
            }
        }
        Ok(Self { name, points })
    }

    pub fn from_pairs(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self, LrsError> {
        let points = pairs
            .into_iter()
            .map(|(date, rate_pct)| RatePoint { date, rate_pct })
            .collect();
        Self::new(name, points)
    }

    /// A series holding one rate for all dates.
    pub fn constant(
        name: impl Into<String>,
        date: NaiveDate,
        rate_pct: f64,
    ) -> Result<Self, LrsError> {
        Self::new(name, vec![RatePoint { date, rate_pct }])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[RatePoint] {
        &self.points
    }

    /// One rate per target date: the latest observation on or before the
    /// date, or the first observation for dates that precede all of them.
    ///
    /// `targets` must be sorted ascending.
    pub fn align_to(&self, targets: &[NaiveDate]) -> Result<Vec<f64>, LrsError> {
        let first = match self.points.first() {
            Some(p) => p,
            None => {
                let (from, to) = match (targets.first(), targets.last()) {
                    (Some(&f), Some(&t)) => (f, t),
                    _ => (NaiveDate::MIN, NaiveDate::MAX),
                };
                return Err(LrsError::DataAlignment {
                    reason: format!("rate series {} has no observations", self.name),
                    from,
                    to,
                });
            }
        };

        let mut aligned = Vec::with_capacity(targets.len());
        let mut cursor = 0usize;
        let mut current: Option<f64> = None;
        for &date in targets {
            while cursor < self.points.len() && self.points[cursor].date <= date {
                current = Some(self.points[cursor].rate_pct);
                cursor += 1;
            }
            aligned.push(current.unwrap_or(first.rate_pct));
        }
        Ok(aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_series() -> PriceSeries {
        PriceSeries::from_pairs(
            "QQQ",
            vec![
                (date(2024, 1, 2), 100.0),
                (date(2024, 1, 3), 110.0),
                (date(2024, 1, 5), 99.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err = PriceSeries::from_pairs(
            "QQQ",
            vec![(date(2024, 1, 2), 100.0), (date(2024, 1, 2), 101.0)],
        )
        .unwrap_err();
        assert!(matches!(err, LrsError::InvalidSeries { .. }));
    }

    #[test]
    fn rejects_unsorted_dates() {
        let result = PriceSeries::from_pairs(
            "QQQ",
            vec![(date(2024, 1, 3), 100.0), (date(2024, 1, 2), 101.0)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_positive_close() {
        assert!(PriceSeries::from_pairs("QQQ", vec![(date(2024, 1, 2), 0.0)]).is_err());
        assert!(PriceSeries::from_pairs("QQQ", vec![(date(2024, 1, 2), f64::NAN)]).is_err());
    }

    #[test]
    fn index_lookup_by_date() {
        let s = sample_series();
        assert_eq!(s.index_of(date(2024, 1, 3)), Some(1));
        assert_eq!(s.index_of(date(2024, 1, 4)), None);
        assert_eq!(s.close_on(date(2024, 1, 5)), Some(99.0));
    }

    #[test]
    fn daily_returns_and_total_return() {
        let s = sample_series();
        let r = s.daily_returns();
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(r[1], -0.1, epsilon = 1e-12);
        assert_relative_eq!(s.total_return_pct().unwrap(), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn total_return_needs_two_points() {
        let s = PriceSeries::from_pairs("QQQ", vec![(date(2024, 1, 2), 100.0)]).unwrap();
        assert!(s.total_return_pct().is_none());
    }

    #[test]
    fn slice_between_is_inclusive() {
        let s = sample_series();
        let sliced = s.slice_between(Some(date(2024, 1, 3)), Some(date(2024, 1, 5)));
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced.name(), "QQQ");
        assert_eq!(s.slice_between(None, Some(date(2024, 1, 2))).len(), 1);
    }

    #[test]
    fn align_forward_fills_then_back_fills() {
        let rates = RateSeries::from_pairs(
            "IRX",
            vec![(date(2024, 1, 3), 5.0), (date(2024, 1, 6), 4.0)],
        )
        .unwrap();
        let targets = [
            date(2024, 1, 2),
            date(2024, 1, 3),
            date(2024, 1, 4),
            date(2024, 1, 8),
        ];
        let aligned = rates.align_to(&targets).unwrap();
        assert_eq!(aligned, vec![5.0, 5.0, 5.0, 4.0]);
    }

    #[test]
    fn align_empty_rates_is_alignment_error() {
        let rates = RateSeries::new("IRX", vec![]).unwrap();
        let err = rates.align_to(&[date(2024, 1, 2)]).unwrap_err();
        assert!(matches!(err, LrsError::DataAlignment { .. }));
    }

    #[test]
    fn rates_may_be_zero_or_negative() {
        let rates = RateSeries::from_pairs(
            "IRX",
            vec![(date(2024, 1, 2), 0.0), (date(2024, 1, 3), -0.1)],
        );
        assert!(rates.is_ok());
    }
}
