#![allow(dead_code)]

use chrono::NaiveDate;
use lrstrader::domain::error::LrsError;
use lrstrader::domain::price::{PriceSeries, RateSeries};
use lrstrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub closes: HashMap<String, PriceSeries>,
    pub rates: HashMap<String, RateSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            closes: HashMap::new(),
            rates: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.closes.insert(series.name().to_string(), series);
        self
    }

    pub fn with_rates(mut self, rates: RateSeries) -> Self {
        self.rates.insert(rates.name().to_string(), rates);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<(), LrsError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(LrsError::Data {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn missing(symbol: &str) -> LrsError {
        LrsError::Data {
            reason: format!("no data for {symbol}"),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_closes(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, LrsError> {
        self.check(symbol)?;
        let series = self.closes.get(symbol).ok_or_else(|| Self::missing(symbol))?;
        Ok(series.slice_between(start, end))
    }

    fn fetch_rates(
        &self,
        symbol: &str,
        _start: Option<NaiveDate>,
        _end: Option<NaiveDate>,
    ) -> Result<RateSeries, LrsError> {
        self.check(symbol)?;
        self.rates.get(symbol).cloned().ok_or_else(|| Self::missing(symbol))
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LrsError> {
        self.check(symbol)?;
        Ok(self
            .closes
            .get(symbol)
            .and_then(|s| s.date_range().map(|(a, b)| (a, b, s.len()))))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days starting at `start`.
pub fn series_from(name: &str, start: NaiveDate, closes: &[f64]) -> PriceSeries {
    PriceSeries::from_pairs(
        name,
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| (start + chrono::Duration::days(i as i64), c)),
    )
    .unwrap()
}

pub fn flat_series(name: &str, count: usize, price: f64) -> PriceSeries {
    series_from(name, date(2020, 1, 1), &vec![price; count])
}

pub fn linear_series(name: &str, count: usize, start_price: f64, step: f64) -> PriceSeries {
    let closes: Vec<f64> = (0..count).map(|i| start_price + step * i as f64).collect();
    series_from(name, date(2020, 1, 1), &closes)
}

/// A smooth underlying path with a trend and a slow oscillation.
pub fn wavy_closes(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            100.0 * (1.0 + 0.0004 * t) + 8.0 * (t / 25.0).sin()
        })
        .collect()
}

/// Leveraged closes simulated from `underlying` with a flat daily drag.
pub fn leveraged_closes(
    underlying: &[f64],
    leverage: f64,
    daily_drag: f64,
    start: f64,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(underlying.len());
    let mut price = start;
    for (i, &c) in underlying.iter().enumerate() {
        if i > 0 {
            let r = c / underlying[i - 1] - 1.0;
            price *= 1.0 + leverage * r - daily_drag;
        }
        out.push(price);
    }
    out
}
