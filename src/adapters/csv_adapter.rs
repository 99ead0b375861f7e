//! CSV file data adapter and CSV export writers.
//!
//! Each symbol lives in `<base_path>/<SYMBOL>.csv` with a header row. Column
//! lookup is by header name, case-insensitive, so files exported from most
//! data vendors load without reshaping.

use crate::domain::error::LrsError;
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::Trade;
use crate::domain::price::{PriceSeries, RateSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CLOSE_COLUMNS: &[&str] = &["close", "adj close", "adj_close"];
const RATE_COLUMNS: &[&str] = &["rate", "close", "value"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// `(date, value)` rows sorted by date. Rows with an empty value are skipped.
    fn read_column(
        &self,
        symbol: &str,
        candidates: &[&str],
    ) -> Result<Vec<(NaiveDate, f64)>, LrsError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| LrsError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| LrsError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        let date_col = names.iter().position(|h| h == "date").ok_or_else(|| LrsError::Data {
            reason: format!("{}: missing date column", path.display()),
        })?;
        let value_col = candidates
            .iter()
            .find_map(|c| names.iter().position(|h| h == c))
            .ok_or_else(|| LrsError::Data {
                reason: format!(
                    "{}: missing value column (expected one of {})",
                    path.display(),
                    candidates.join(", ")
                ),
            })?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| LrsError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(date_col).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| LrsError::Data {
                reason: format!("invalid date {:?} in {}: {}", date_str, path.display(), e),
            })?;

            let raw = record.get(value_col).unwrap_or("").trim();
            if raw.is_empty() {
                continue;
            }
            let value: f64 = raw.parse().map_err(|e| LrsError::Data {
                reason: format!("invalid value {:?} on {}: {}", raw, date, e),
            })?;
            rows.push((date, value));
        }

        rows.sort_by_key(|&(d, _)| d);
        debug!(symbol, rows = rows.len(), "loaded {}", path.display());
        Ok(rows)
    }
}

fn in_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
}

impl DataPort for CsvAdapter {
    fn fetch_closes(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, LrsError> {
        let rows = self.read_column(symbol, CLOSE_COLUMNS)?;
        PriceSeries::from_pairs(symbol, rows.into_iter().filter(|&(d, _)| in_range(d, start, end)))
    }

    fn fetch_rates(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<RateSeries, LrsError> {
        let rows = self.read_column(symbol, RATE_COLUMNS)?;
        RateSeries::from_pairs(symbol, rows.into_iter().filter(|&(d, _)| in_range(d, start, end)))
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LrsError> {
        if !self.csv_path(symbol).exists() {
            return Ok(None);
        }
        let rows = self.read_column(symbol, CLOSE_COLUMNS)?;
        Ok(match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => Some((first.0, last.0, rows.len())),
            _ => None,
        })
    }
}

/// Write `date,close` rows.
pub fn write_series(path: &Path, series: &PriceSeries) -> Result<(), LrsError> {
    let mut wtr = csv::Writer::from_path(path).map_err(std::io::Error::from)?;
    wtr.write_record(["date", "close"]).map_err(std::io::Error::from)?;
    for p in series.points() {
        wtr.write_record([p.date.to_string(), p.close.to_string()])
            .map_err(std::io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_trades(path: &Path, trades: &[Trade]) -> Result<(), LrsError> {
    let mut wtr = csv::Writer::from_path(path).map_err(std::io::Error::from)?;
    wtr.write_record([
        "date",
        "type",
        "signal_price",
        "moving_average",
        "reference_level",
        "instrument_price",
        "pnl_pct",
    ])
    .map_err(std::io::Error::from)?;
    for t in trades {
        wtr.write_record([
            t.date.to_string(),
            t.kind.to_string(),
            t.signal_price.to_string(),
            t.moving_average.to_string(),
            t.reference_level.to_string(),
            t.instrument_price.to_string(),
            t.pnl_pct.map(|p| p.to_string()).unwrap_or_default(),
        ])
        .map_err(std::io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_equity(path: &Path, curve: &[EquityPoint]) -> Result<(), LrsError> {
    let mut wtr = csv::Writer::from_path(path).map_err(std::io::Error::from)?;
    wtr.write_record(["date", "equity"]).map_err(std::io::Error::from)?;
    for p in curve {
        wtr.write_record([p.date.to_string(), p.equity.to_string()])
            .map_err(std::io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}
