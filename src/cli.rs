//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::console_report::ConsoleReport;
use crate::adapters::csv_adapter::{self, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{DEFAULT_INITIAL_CAPITAL, align_days};
use crate::domain::calibration::{CalibrationConfig, CalibrationResult, calibrate_or_fallback};
use crate::domain::config_validation::{
    STRATEGY_SECTION_PREFIX, integer, number, optional_date, strategy_sections, validate_config,
};
use crate::domain::drag::DragModel;
use crate::domain::error::LrsError;
use crate::domain::indicator::sma::DEFAULT_SMA_WINDOW;
use crate::domain::metrics::BuyAndHold;
use crate::domain::price::PriceSeries;
use crate::domain::strategy::{StrategyConfig, default_presets};
use crate::domain::sweep::{SweepReport, run_sweep};
use crate::domain::synthetic::{SyntheticBuilder, SyntheticSeries, tracking_error};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{ReportPort, RunReport};

#[derive(Parser, Debug)]
#[command(name = "lrstrader", about = "Leveraged ETF moving-average buffer backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every configured strategy and print the report
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Extend the leveraged history with a calibrated synthetic series
        #[arg(long)]
        synthetic: bool,
        /// Directory for trade and equity CSV files
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Calibrate the borrowing spread against the real leveraged series
    Calibrate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Build and export the spliced synthetic series
    Synthetic {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Also write the unspliced synthetic series here
        #[arg(long)]
        validation: Option<PathBuf>,
    },
    /// Validate a configuration without reading any data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for the configured symbols
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Where the price files live and which symbols to read.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSources {
    pub directory: PathBuf,
    pub underlying: String,
    pub leveraged: String,
    pub rates: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    pub ma_window: usize,
    pub trade_log: usize,
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSettings {
    pub enabled: bool,
    pub model: DragModel,
    pub calibration: CalibrationConfig,
    pub default_spread: f64,
    pub cutover: Option<NaiveDate>,
}

/// Inputs to the sweep once any synthetic extension has been applied.
#[derive(Debug, Clone)]
pub struct PreparedHistory {
    pub signal: PriceSeries,
    pub tradable: PriceSeries,
    pub calibration: Option<CalibrationResult>,
    pub synthetic: Option<SyntheticSeries>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            synthetic,
            export,
        } => run_backtest(&config, synthetic, export.as_deref()),
        Command::Calibrate { config } => run_calibrate(&config),
        Command::Synthetic {
            config,
            output,
            validation,
        } => run_synthetic(&config, &output, validation.as_deref()),
        Command::Validate { config } => run_dry_run(&config),
        Command::Info { config } => run_info(&config),
    }
}

fn exit_with(result: Result<(), LrsError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = LrsError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        error!("{err}");
        ExitCode::from(&err)
    })
}

fn load_validated(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = load_config(path)?;
    if let Err(e) = validate_config(&adapter) {
        error!("{e}");
        return Err((&e).into());
    }
    Ok(adapter)
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, LrsError> {
    config
        .get_string(section, key)
        .ok_or_else(|| LrsError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

pub fn build_data_sources(config: &dyn ConfigPort) -> Result<DataSources, LrsError> {
    Ok(DataSources {
        directory: PathBuf::from(require(config, "data", "directory")?),
        underlying: require(config, "data", "underlying")?.to_uppercase(),
        leveraged: require(config, "data", "leveraged")?.to_uppercase(),
        rates: config.get_string("data", "rates").map(|s| s.to_uppercase()),
        start_date: optional_date(config, "data", "start_date")?,
        end_date: optional_date(config, "data", "end_date")?,
    })
}

fn positive_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, LrsError> {
    let value = integer(config, section, key, default)?;
    usize::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| LrsError::config_invalid(section, key, format!("{key} must be at least 1")))
}

pub fn build_backtest_settings(config: &dyn ConfigPort) -> Result<BacktestSettings, LrsError> {
    let trade_log = integer(config, "backtest", "trade_log", 20)?;
    Ok(BacktestSettings {
        initial_capital: number(config, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?,
        ma_window: positive_count(config, "backtest", "ma_window", DEFAULT_SMA_WINDOW as i64)?,
        trade_log: usize::try_from(trade_log).unwrap_or(0),
        parallel: config.get_bool("backtest", "parallel", true),
    })
}

pub fn build_synthetic_settings(config: &dyn ConfigPort) -> Result<SyntheticSettings, LrsError> {
    let defaults = DragModel::default();
    let model = DragModel {
        leverage: number(config, "synthetic", "leverage", defaults.leverage)?,
        expense_ratio: number(config, "synthetic", "expense_ratio", defaults.expense_ratio)?,
        trading_days: number(config, "synthetic", "trading_days", defaults.trading_days)?,
        rate_multiplier: number(config, "synthetic", "rate_multiplier", defaults.rate_multiplier)?,
    };
    model.validate()?;

    let grid = CalibrationConfig::default();
    let calibration = CalibrationConfig {
        spread_min: number(config, "synthetic", "spread_min", grid.spread_min)?,
        spread_max: number(config, "synthetic", "spread_max", grid.spread_max)?,
        samples: positive_count(config, "synthetic", "spread_samples", grid.samples as i64)?,
        parallel: config.get_bool("backtest", "parallel", true),
    };
    calibration.validate()?;

    let default_spread = number(config, "synthetic", "default_spread", 0.01)?;
    if default_spread < 0.0 {
        return Err(LrsError::config_invalid(
            "synthetic",
            "default_spread",
            "default_spread must be non-negative",
        ));
    }

    Ok(SyntheticSettings {
        enabled: config.get_bool("synthetic", "enabled", false),
        model,
        calibration,
        default_spread,
        cutover: optional_date(config, "synthetic", "cutover_date")?,
    })
}

/// `[strategy.<id>]` sections in file order, or the default presets when
/// there are none. Sections without `ma_window` use `default_window`.
pub fn build_strategies(
    config: &dyn ConfigPort,
    default_window: usize,
) -> Result<Vec<StrategyConfig>, LrsError> {
    let sections = strategy_sections(config);
    if sections.is_empty() {
        return Ok(default_presets()
            .into_iter()
            .map(|s| s.with_window(default_window))
            .collect());
    }

    let mut strategies = Vec::with_capacity(sections.len());
    for section in sections {
        let id = section.trim_start_matches(STRATEGY_SECTION_PREFIX);
        let name = config.get_string(&section, "name").unwrap_or_else(|| id.to_string());
        let buy_buffer = number(config, &section, "buy_buffer", f64::NAN)?;
        let sell_buffer = number(config, &section, "sell_buffer", f64::NAN)?;
        let window = positive_count(config, &section, "ma_window", default_window as i64)?;

        let strategy = StrategyConfig::new(name, buy_buffer, sell_buffer).with_window(window);
        strategy.validate()?;
        strategies.push(strategy);
    }
    Ok(strategies)
}

fn fetch_range(
    data_port: &dyn DataPort,
    sources: &DataSources,
    symbol: &str,
) -> Result<PriceSeries, LrsError> {
    data_port.fetch_closes(symbol, sources.start_date, sources.end_date)
}

fn require_rates(sources: &DataSources) -> Result<&str, LrsError> {
    sources.rates.as_deref().ok_or_else(|| LrsError::ConfigMissing {
        section: "data".into(),
        key: "rates".into(),
    })
}

/// Calibrate the spread over the real overlap, then build the spliced series.
pub fn build_synthetic_history(
    data_port: &dyn DataPort,
    sources: &DataSources,
    settings: &SyntheticSettings,
) -> Result<(PriceSeries, CalibrationResult, SyntheticSeries), LrsError> {
    let rates_symbol = require_rates(sources)?;
    let underlying = fetch_range(data_port, sources, &sources.underlying)?;
    let leveraged = fetch_range(data_port, sources, &sources.leveraged)?;
    let rates = data_port.fetch_rates(rates_symbol, None, sources.end_date)?;

    let calibration = calibrate_or_fallback(
        &underlying,
        &leveraged,
        &rates,
        &settings.model,
        &settings.calibration,
        settings.default_spread,
    )?;

    let mut builder = SyntheticBuilder::new(settings.model, calibration.spread);
    if let Some(cutover) = settings.cutover {
        builder = builder.with_cutover(cutover);
    }
    let synthetic = builder.build(&underlying, &leveraged, &rates)?;

    if let Some(stats) = tracking_error(&synthetic.synthetic, &leveraged) {
        info!(
            days = stats.days,
            final_ratio = stats.final_ratio,
            max_deviation_pct = stats.max_abs_deviation_pct,
            "synthetic tracking versus {}",
            leveraged.name()
        );
    }
    Ok((underlying, calibration, synthetic))
}

pub fn prepare_history(
    data_port: &dyn DataPort,
    sources: &DataSources,
    synthetic: Option<&SyntheticSettings>,
) -> Result<PreparedHistory, LrsError> {
    match synthetic {
        Some(settings) => {
            let (signal, calibration, series) =
                build_synthetic_history(data_port, sources, settings)?;
            Ok(PreparedHistory {
                signal,
                tradable: series.spliced.clone(),
                calibration: Some(calibration),
                synthetic: Some(series),
            })
        }
        None => {
            info!("fetching {} and {}", sources.underlying, sources.leveraged);
            Ok(PreparedHistory {
                signal: fetch_range(data_port, sources, &sources.underlying)?,
                tradable: fetch_range(data_port, sources, &sources.leveraged)?,
                calibration: None,
                synthetic: None,
            })
        }
    }
}

/// Buy-and-hold on the tradable closes of the joined days, entered at the
/// first day a full moving-average window is available.
pub fn benchmark(
    signal: &PriceSeries,
    tradable: &PriceSeries,
    ma_window: usize,
) -> Option<BuyAndHold> {
    let joined = PriceSeries::from_pairs(
        tradable.name(),
        align_days(signal, tradable).into_iter().map(|(d, _, t)| (d, t)),
    )
    .ok()?;
    BuyAndHold::compute(&joined, ma_window)
}

/// Entry index for the benchmark: the end of the shortest strategy warm-up,
/// or `default_window` when there are no strategies.
pub fn benchmark_window(strategies: &[StrategyConfig], default_window: usize) -> usize {
    strategies
        .iter()
        .map(|s| s.ma_window)
        .min()
        .unwrap_or(default_window)
}

fn file_slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    slug.split('_').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("_")
}

pub fn export_results(
    dir: &Path,
    sweep: &SweepReport,
    history: &PreparedHistory,
) -> Result<(), LrsError> {
    fs::create_dir_all(dir)?;
    for (i, r) in sweep.results.iter().enumerate() {
        let slug = format!("{:02}_{}", i + 1, file_slug(&r.strategy.name));
        csv_adapter::write_trades(&dir.join(format!("trades_{slug}.csv")), &r.trades)?;
        csv_adapter::write_equity(&dir.join(format!("equity_{slug}.csv")), &r.equity_curve)?;
    }
    if history.synthetic.is_some() {
        csv_adapter::write_series(
            &dir.join(format!("{}_spliced.csv", history.tradable.name())),
            &history.tradable,
        )?;
    }
    info!("exported {} strategies to {}", sweep.len(), dir.display());
    Ok(())
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    sources: &DataSources,
    settings: &BacktestSettings,
    synthetic: Option<&SyntheticSettings>,
    strategies: &[StrategyConfig],
    export: Option<&Path>,
    out: &mut dyn Write,
) -> Result<SweepReport, LrsError> {
    let history = prepare_history(data_port, sources, synthetic)?;
    info!(
        signal_days = history.signal.len(),
        tradable_days = history.tradable.len(),
        "running {} strategies",
        strategies.len()
    );

    let sweep = run_sweep(
        &history.signal,
        &history.tradable,
        strategies,
        settings.initial_capital,
        settings.parallel,
    )?;

    let report = RunReport {
        signal: &history.signal,
        tradable: &history.tradable,
        sweep: &sweep,
        benchmark: benchmark(
            &history.signal,
            &history.tradable,
            benchmark_window(strategies, settings.ma_window),
        ),
        calibration: history.calibration.as_ref(),
        cutover: history.synthetic.as_ref().map(|s| s.cutover),
        trade_log: settings.trade_log,
    };
    ConsoleReport::new().write(&report, out)?;

    if let Some(dir) = export {
        export_results(dir, &sweep, &history)?;
    }
    Ok(sweep)
}

fn run_backtest(config_path: &Path, force_synthetic: bool, export: Option<&Path>) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    exit_with(backtest_command(&adapter, force_synthetic, export))
}

fn backtest_command(
    adapter: &dyn ConfigPort,
    force_synthetic: bool,
    export: Option<&Path>,
) -> Result<(), LrsError> {
    let sources = build_data_sources(adapter)?;
    let settings = build_backtest_settings(adapter)?;
    let synthetic = build_synthetic_settings(adapter)?;
    let strategies = build_strategies(adapter, settings.ma_window)?;
    let use_synthetic = force_synthetic || synthetic.enabled;

    let data_port = CsvAdapter::new(sources.directory.clone());
    let mut out = std::io::stdout().lock();
    run_backtest_pipeline(
        &data_port,
        &sources,
        &settings,
        use_synthetic.then_some(&synthetic),
        &strategies,
        export,
        &mut out,
    )?;
    Ok(())
}

pub fn print_calibration(result: &CalibrationResult, out: &mut dyn Write) -> Result<(), LrsError> {
    writeln!(out, "spread:           {:.6}", result.spread)?;
    writeln!(out, "source:           {:?}", result.source)?;
    writeln!(out, "overlap days:     {}", result.overlap_days)?;
    if let Some((from, to)) = result.overlap {
        writeln!(out, "overlap:          {} to {}", from, to)?;
        writeln!(out, "real factor:      {:.6}", result.real_factor)?;
        writeln!(out, "simulated factor: {:.6}", result.simulated_factor)?;
        writeln!(out, "error:            {:.6}", result.cumulative_error)?;
    }
    Ok(())
}

fn run_calibrate(config_path: &Path) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    exit_with(calibrate_command(&adapter))
}

fn calibrate_command(adapter: &dyn ConfigPort) -> Result<(), LrsError> {
    let sources = build_data_sources(adapter)?;
    let settings = build_synthetic_settings(adapter)?;
    let data_port = CsvAdapter::new(sources.directory.clone());
    let result = run_calibration(&data_port, &sources, &settings)?;
    print_calibration(&result, &mut std::io::stdout().lock())
}

pub fn run_calibration(
    data_port: &dyn DataPort,
    sources: &DataSources,
    settings: &SyntheticSettings,
) -> Result<CalibrationResult, LrsError> {
    let rates_symbol = require_rates(sources)?;
    let underlying = fetch_range(data_port, sources, &sources.underlying)?;
    let leveraged = fetch_range(data_port, sources, &sources.leveraged)?;
    let rates = data_port.fetch_rates(rates_symbol, None, sources.end_date)?;

    calibrate_or_fallback(
        &underlying,
        &leveraged,
        &rates,
        &settings.model,
        &settings.calibration,
        settings.default_spread,
    )
}

pub fn run_synthetic_pipeline(
    data_port: &dyn DataPort,
    sources: &DataSources,
    settings: &SyntheticSettings,
    output: &Path,
    validation: Option<&Path>,
) -> Result<SyntheticSeries, LrsError> {
    let (_, calibration, series) = build_synthetic_history(data_port, sources, settings)?;
    info!(spread = calibration.spread, source = ?calibration.source, "using spread");

    csv_adapter::write_series(output, &series.spliced)?;
    info!("spliced series written to {}", output.display());

    if let Some(path) = validation {
        csv_adapter::write_series(path, &series.synthetic)?;
        info!("synthetic series written to {}", path.display());
    }
    Ok(series)
}

fn run_synthetic(config_path: &Path, output: &Path, validation: Option<&Path>) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    exit_with(synthetic_command(&adapter, output, validation))
}

fn synthetic_command(
    adapter: &dyn ConfigPort,
    output: &Path,
    validation: Option<&Path>,
) -> Result<(), LrsError> {
    let sources = build_data_sources(adapter)?;
    let settings = build_synthetic_settings(adapter)?;
    let data_port = CsvAdapter::new(sources.directory.clone());
    run_synthetic_pipeline(&data_port, &sources, &settings, output, validation)?;
    Ok(())
}

/// Validate and print what a backtest would run, without reading data.
pub fn run_dry_run(config_path: &Path) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    exit_with(dry_run_command(&adapter, &mut std::io::stdout().lock()))
}

pub fn dry_run_command(adapter: &dyn ConfigPort, out: &mut dyn Write) -> Result<(), LrsError> {
    let sources = build_data_sources(adapter)?;
    let settings = build_backtest_settings(adapter)?;
    let synthetic = build_synthetic_settings(adapter)?;
    let strategies = build_strategies(adapter, settings.ma_window)?;
    info!("config validated successfully");

    writeln!(out, "Data:       {}", sources.directory.display())?;
    writeln!(out, "  signal:   {}", sources.underlying)?;
    writeln!(out, "  tradable: {}", sources.leveraged)?;
    if let Some(rates) = &sources.rates {
        writeln!(out, "  rates:    {}", rates)?;
    }
    writeln!(out, "Capital:    {:.2}", settings.initial_capital)?;
    writeln!(out, "Synthetic:  {}", if synthetic.enabled { "enabled" } else { "disabled" })?;
    writeln!(out, "\nStrategies:")?;
    for s in &strategies {
        writeln!(
            out,
            "  {:<30} buy {:+.4}  sell {:+.4}  SMA({})",
            s.name, s.buy_buffer, s.sell_buffer, s.ma_window
        )?;
    }
    Ok(())
}

fn run_info(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    exit_with(info_command(&adapter))
}

fn info_command(adapter: &dyn ConfigPort) -> Result<(), LrsError> {
    let sources = build_data_sources(adapter)?;
    let data_port = CsvAdapter::new(sources.directory.clone());
    let symbols = [Some(&sources.underlying), Some(&sources.leveraged), sources.rates.as_ref()];

    for symbol in symbols.into_iter().flatten() {
        match data_port.get_data_range(symbol) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} rows, {} to {}", symbol, count, min_date, max_date);
            }
            Ok(None) => {
                warn!("{}: no data found", symbol);
            }
            Err(e) => {
                error!("error querying {}: {}", symbol, e);
            }
        }
    }
    Ok(())
}
