//! Technical indicator types.

pub mod sma;

use chrono::NaiveDate;

/// One dated indicator value, `None` during warm-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl IndicatorPoint {
    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }
}
