//! Plain-text report adapter implementing ReportPort.

use std::io::Write;

use crate::domain::backtest::BacktestResult;
use crate::domain::calibration::{CalibrationResult, SpreadSource};
use crate::domain::error::LrsError;
use crate::domain::position::TradeKind;
use crate::domain::price::PriceSeries;
use crate::ports::report_port::{ReportPort, RunReport};

const RULE_WIDTH: usize = 80;

#[derive(Debug, Default)]
pub struct ConsoleReport;

impl ConsoleReport {
    pub fn new() -> Self {
        Self
    }
}

fn heading(out: &mut dyn Write, title: &str) -> std::io::Result<()> {
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out)
}

/// `12345.678` -> `12,345.68`.
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

fn write_data_summary(out: &mut dyn Write, series: &[&PriceSeries]) -> std::io::Result<()> {
    heading(out, "DATA SUMMARY")?;
    for s in series {
        match (s.first(), s.last()) {
            (Some(first), Some(last)) => {
                writeln!(
                    out,
                    "{}: {} days, {} to {}",
                    s.name(),
                    s.len(),
                    first.date,
                    last.date
                )?;
                writeln!(
                    out,
                    "  ${:.2} -> ${:.2} ({:+.2}%)",
                    first.close,
                    last.close,
                    s.total_return_pct().unwrap_or(0.0)
                )?;
            }
            _ => writeln!(out, "{}: no data", s.name())?,
        }
    }
    writeln!(out)
}

fn write_calibration(
    out: &mut dyn Write,
    calibration: &CalibrationResult,
    report: &RunReport<'_>,
) -> std::io::Result<()> {
    heading(out, "SYNTHETIC HISTORY")?;
    match calibration.source {
        SpreadSource::Calibrated => {
            writeln!(out, "Calibrated spread:   {:>10.4}%", calibration.spread * 100.0)?;
            if let Some((from, to)) = calibration.overlap {
                writeln!(
                    out,
                    "Overlap:             {} to {} ({} days)",
                    from, to, calibration.overlap_days
                )?;
            }
            writeln!(
                out,
                "Real factor:         {:>10.4}x  simulated {:.4}x  (error {:.6})",
                calibration.real_factor, calibration.simulated_factor, calibration.cumulative_error
            )?;
        }
        SpreadSource::Fallback => {
            writeln!(
                out,
                "Default spread:      {:>10.4}% (overlap too short to calibrate)",
                calibration.spread * 100.0
            )?;
        }
    }
    if let Some(cutover) = report.cutover {
        writeln!(out, "Real data from:      {}", cutover)?;
    }
    writeln!(out)
}

fn write_summary_table(out: &mut dyn Write, report: &RunReport<'_>) -> std::io::Result<()> {
    heading(out, "BACKTEST RESULTS SUMMARY")?;
    writeln!(
        out,
        "{:<30} {:<15} {:<12} {:<12} {:<10} {:<12}",
        "Strategy", "Total Return", "CAGR", "Max DD", "Trades", "Win Rate"
    )?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    for r in &report.sweep.results {
        writeln!(
            out,
            "{:<30} {:>12.2}%  {:>10.2}%  {:>10.2}%  {:>8}  {:>10.2}%",
            r.strategy.name,
            r.total_return_pct,
            r.cagr_pct,
            r.max_drawdown_pct,
            r.num_trades,
            r.win_rate_pct
        )?;
    }
    if let Some(bh) = &report.benchmark {
        writeln!(
            out,
            "{:<30} {:>12.2}%  {:>10.2}%  {:<12} {:<10} {:<12}",
            format!("{} Buy and Hold", report.tradable.name()),
            bh.total_return_pct,
            bh.cagr_pct,
            "N/A",
            "N/A",
            "N/A"
        )?;
    }
    writeln!(out)
}

fn write_details(out: &mut dyn Write, r: &BacktestResult) -> std::io::Result<()> {
    writeln!(out, "Strategy: {}", r.strategy.name)?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    writeln!(out, "Total Return:        {:>10.2}%", r.total_return_pct)?;
    writeln!(out, "CAGR:                {:>10.2}%", r.cagr_pct)?;
    writeln!(out, "Maximum Drawdown:    {:>10.2}%", r.max_drawdown_pct)?;
    writeln!(out, "Number of Trades:    {:>10}", r.num_trades)?;
    writeln!(out, "Win Rate:            {:>10.2}%", r.win_rate_pct)?;
    writeln!(out, "Average Win:         {:>10.2}%", r.avg_win_pct)?;
    writeln!(out, "Average Loss:        {:>10.2}%", r.avg_loss_pct)?;
    writeln!(out, "Final Portfolio:     ${:>10}", format_money(r.final_value))?;
    writeln!(out, "Years Tested:        {:>10.1}", r.years)?;
    if r.open_position {
        writeln!(out, "Position:            {:>10}", "open")?;
    }
    writeln!(out)
}

fn write_trade_log(
    out: &mut dyn Write,
    r: &BacktestResult,
    signal: &str,
    tradable: &str,
    count: usize,
) -> std::io::Result<()> {
    heading(out, &format!("LAST {} TRADE EVENTS - {}", count, r.strategy.name))?;
    let skip = r.trades.len().saturating_sub(count);
    for t in &r.trades[skip..] {
        match t.kind {
            TradeKind::Buy => {
                writeln!(out, "{}: BUY  {} @ ${:.2}", t.date, tradable, t.instrument_price)?;
                writeln!(
                    out,
                    "           ({} ${:.2} > Buy Level ${:.2})",
                    signal, t.signal_price, t.reference_level
                )?;
            }
            TradeKind::Sell => {
                writeln!(
                    out,
                    "{}: SELL {} @ ${:.2} (P/L: {:+.2}%)",
                    t.date,
                    tradable,
                    t.instrument_price,
                    t.pnl_pct.unwrap_or(0.0)
                )?;
                writeln!(
                    out,
                    "           ({} ${:.2} < Sell Level ${:.2})",
                    signal, t.signal_price, t.reference_level
                )?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

impl ReportPort for ConsoleReport {
    fn write(&self, report: &RunReport<'_>, out: &mut dyn Write) -> Result<(), LrsError> {
        write_data_summary(out, &[report.signal, report.tradable])?;
        if let Some(calibration) = report.calibration {
            write_calibration(out, calibration, report)?;
        }
        write_summary_table(out, report)?;

        heading(out, "DETAILED PERFORMANCE METRICS")?;
        for r in &report.sweep.results {
            write_details(out, r)?;
        }

        if let Some(best) = report.sweep.winner() {
            heading(out, "WINNER")?;
            writeln!(out, "The {} strategy", best.strategy.name)?;
            writeln!(
                out,
                "achieved the highest total return of {:.2}%",
                best.total_return_pct
            )?;
            writeln!(
                out,
                "with a CAGR of {:.2}% and {} trades.",
                best.cagr_pct, best.num_trades
            )?;
            writeln!(out)?;

            if report.trade_log > 0 && !best.trades.is_empty() {
                write_trade_log(
                    out,
                    best,
                    report.signal.name(),
                    report.tradable.name(),
                    report.trade_log,
                )?;
            }
        }
        Ok(())
    }
}
