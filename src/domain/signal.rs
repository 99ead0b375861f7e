//! Buy/sell threshold levels around a moving average.
//!
//! buy  = MA * (1 + buy_buffer)
//! sell = MA * (1 - sell_buffer)
//!
//! Buffers are fractions (0.03 = 3%). Levels exist only where the moving
//! average does.

use chrono::NaiveDate;

use crate::domain::indicator::IndicatorPoint;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalLevels {
    pub moving_average: f64,
    pub buy_level: f64,
    pub sell_level: f64,
}

impl SignalLevels {
    pub fn from_average(moving_average: f64, buy_buffer: f64, sell_buffer: f64) -> Self {
        SignalLevels {
            moving_average,
            buy_level: moving_average * (1.0 + buy_buffer),
            sell_level: moving_average * (1.0 - sell_buffer),
        }
    }

    pub fn is_buy(&self, price: f64) -> bool {
        price > self.buy_level
    }

    pub fn is_sell(&self, price: f64) -> bool {
        price < self.sell_level
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub date: NaiveDate,
    pub levels: Option<SignalLevels>,
}

pub fn compute_thresholds(
    moving_average: &[IndicatorPoint],
    buy_buffer: f64,
    sell_buffer: f64,
) -> Vec<Thresholds> {
    moving_average
        .iter()
        .map(|p| Thresholds {
            date: p.date,
            levels: p
                .value
                .map(|ma| SignalLevels::from_average(ma, buy_buffer, sell_buffer)),
        })
        .collect()
}
