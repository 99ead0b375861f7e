//! Data access port trait.

use crate::domain::error::LrsError;
use crate::domain::price::{PriceSeries, RateSeries};
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily closes for `symbol`, restricted to `[start, end]` when given.
    fn fetch_closes(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, LrsError>;

    /// Annualized rate observations in percent, e.g. a T-bill yield.
    fn fetch_rates(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<RateSeries, LrsError>;

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LrsError>;
}
