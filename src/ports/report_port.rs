//! Report generation port trait.

use std::io::Write;

use crate::domain::calibration::CalibrationResult;
use crate::domain::error::LrsError;
use crate::domain::metrics::BuyAndHold;
use crate::domain::price::PriceSeries;
use crate::domain::sweep::SweepReport;
use chrono::NaiveDate;

/// Everything one `backtest` run produced.
#[derive(Debug)]
pub struct RunReport<'a> {
    pub signal: &'a PriceSeries,
    pub tradable: &'a PriceSeries,
    pub sweep: &'a SweepReport,
    /// Buy-and-hold on the tradable series from the first tradable signal day.
    pub benchmark: Option<BuyAndHold>,
    pub calibration: Option<&'a CalibrationResult>,
    /// First real leveraged date when the history is spliced.
    pub cutover: Option<NaiveDate>,
    /// How many of the winner's trades to list.
    pub trade_log: usize,
}

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, report: &RunReport<'_>, out: &mut dyn Write) -> Result<(), LrsError>;
}
