//! CLI integration tests.
//!
//! Tests cover:
//! - Config parsing (build_data_sources, build_backtest_settings,
//!   build_synthetic_settings, build_strategies)
//! - Dry-run mode with real INI files on disk
//! - Full commands over CSV files in a temp directory

mod common;

use chrono::NaiveDate;
use clap::Parser;
use common::*;
use lrstrader::adapters::csv_adapter::{CsvAdapter, write_series};
use lrstrader::adapters::file_config_adapter::FileConfigAdapter;
use lrstrader::cli::{self, Cli};
use lrstrader::domain::drag::DragModel;
use lrstrader::domain::error::LrsError;
use lrstrader::ports::data_port::DataPort;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn exit_code_str(code: ExitCode) -> String {
    format!("{:?}", code)
}

const VALID_INI: &str = r#"
[data]
directory = ./data
underlying = qqq
leveraged = tqqq
rates = irx
start_date = 2010-02-11
end_date = 2024-12-31

[backtest]
initial_capital = 25000
ma_window = 150
trade_log = 10
parallel = false

[synthetic]
enabled = true
leverage = 3
expense_ratio = 0.0095
spread_samples = 101
default_spread = 0.015
cutover_date = 2012-01-03

[strategy.wide]
name = 5% Buy / 3% Sell
buy_buffer = 0.05
sell_buffer = 0.03

[strategy.fast]
buy_buffer = 0.01
sell_buffer = 0.01
ma_window = 50
"#;

mod config_building {
    use super::*;

    #[test]
    fn data_sources_are_uppercased() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let sources = cli::build_data_sources(&adapter).unwrap();

        assert_eq!(sources.underlying, "QQQ");
        assert_eq!(sources.leveraged, "TQQQ");
        assert_eq!(sources.rates.as_deref(), Some("IRX"));
        assert_eq!(sources.start_date, NaiveDate::from_ymd_opt(2010, 2, 11));
        assert_eq!(sources.end_date, NaiveDate::from_ymd_opt(2024, 12, 31));
    }

    #[test]
    fn data_sources_missing_directory() {
        let adapter = FileConfigAdapter::from_string("[data]\nunderlying = QQQ\n").unwrap();
        let err = cli::build_data_sources(&adapter).unwrap_err();
        assert!(matches!(err, LrsError::ConfigMissing { key, .. } if key == "directory"));
    }

    #[test]
    fn backtest_settings_values() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let settings = cli::build_backtest_settings(&adapter).unwrap();

        assert_eq!(settings.initial_capital, 25_000.0);
        assert_eq!(settings.ma_window, 150);
        assert_eq!(settings.trade_log, 10);
        assert!(!settings.parallel);
    }

    #[test]
    fn backtest_settings_defaults() {
        let adapter = FileConfigAdapter::from_string("[data]\ndirectory = d\n").unwrap();
        let settings = cli::build_backtest_settings(&adapter).unwrap();

        assert_eq!(settings.initial_capital, 10_000.0);
        assert_eq!(settings.ma_window, 200);
        assert_eq!(settings.trade_log, 20);
        assert!(settings.parallel);
    }

    #[test]
    fn synthetic_settings_values() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let settings = cli::build_synthetic_settings(&adapter).unwrap();

        assert!(settings.enabled);
        assert_eq!(settings.model, DragModel::default());
        assert_eq!(settings.calibration.samples, 101);
        assert_eq!(settings.calibration.spread_max, 0.05);
        assert!(!settings.calibration.parallel);
        assert_eq!(settings.default_spread, 0.015);
        assert_eq!(settings.cutover, NaiveDate::from_ymd_opt(2012, 1, 3));
    }

    #[test]
    fn synthetic_settings_reject_zero_leverage() {
        let adapter = FileConfigAdapter::from_string("[synthetic]\nleverage = 0\n").unwrap();
        let err = cli::build_synthetic_settings(&adapter).unwrap_err();
        assert!(matches!(err, LrsError::ConfigInvalid { key, .. } if key == "leverage"));
    }

    #[test]
    fn strategies_from_sections_in_order() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let strategies = cli::build_strategies(&adapter, 150).unwrap();

        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].name, "5% Buy / 3% Sell");
        assert_eq!(strategies[0].ma_window, 150);
        assert_eq!(strategies[1].name, "fast");
        assert_eq!(strategies[1].buy_buffer, 0.01);
        assert_eq!(strategies[1].ma_window, 50);
    }

    #[test]
    fn strategies_default_to_presets() {
        let adapter = FileConfigAdapter::from_string("[data]\ndirectory = d\n").unwrap();
        let strategies = cli::build_strategies(&adapter, 120).unwrap();

        assert_eq!(strategies.len(), 7);
        assert!(strategies.iter().all(|s| s.ma_window == 120));
        assert_eq!(strategies[5].buy_buffer, 0.0);
        assert_eq!(strategies[5].sell_buffer, 0.0);
    }

    #[test]
    fn strategy_with_bad_buffer_fails() {
        let content = "[strategy.x]\nbuy_buffer = wide\nsell_buffer = 0.01\n";
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        let err = cli::build_strategies(&adapter, 200).unwrap_err();
        assert!(matches!(err, LrsError::ConfigInvalid { key, .. } if key == "buy_buffer"));
    }
}

mod dry_run {
    use super::*;

    #[test]
    fn dry_run_valid_config() {
        let file = write_temp_ini(VALID_INI);
        let code = cli::run_dry_run(file.path());
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::SUCCESS));
    }

    #[test]
    fn dry_run_lists_strategies() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let mut out: Vec<u8> = Vec::new();
        cli::dry_run_command(&adapter, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("signal:   QQQ"));
        assert!(text.contains("Synthetic:  enabled"));
        assert!(text.contains("5% Buy / 3% Sell"));
        assert!(text.contains("SMA(50)"));
    }

    #[test]
    fn dry_run_missing_file_is_config_error() {
        let code = cli::run_dry_run(Path::new("/nonexistent/lrs.ini"));
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::from(2)));
    }

    #[test]
    fn dry_run_invalid_capital_is_config_error() {
        let file = write_temp_ini(
            "[data]\ndirectory = d\nunderlying = QQQ\nleveraged = TQQQ\n[backtest]\ninitial_capital = -5\n",
        );
        let code = cli::run_dry_run(file.path());
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::from(2)));
    }
}

mod commands {
    use super::*;

    /// QQQ for 400 days, TQQQ for the last 150, a flat rate.
    fn write_data(dir: &Path) {
        let start = date(2018, 1, 1);
        let under = wavy_closes(400);
        let model = DragModel::default();
        let lev = leveraged_closes(&under[250..], 3.0, model.daily_drag(1.5, 0.008), 30.0);

        write_series(&dir.join("QQQ.csv"), &series_from("QQQ", start, &under)).unwrap();
        write_series(
            &dir.join("TQQQ.csv"),
            &series_from("TQQQ", start + chrono::Duration::days(250), &lev),
        )
        .unwrap();
        fs::write(dir.join("IRX.csv"), "Date,Close\n2017-12-29,1.5\n").unwrap();
    }

    fn ini_for(dir: &Path, extra: &str) -> String {
        format!(
            "[data]\ndirectory = {}\nunderlying = QQQ\nleveraged = TQQQ\nrates = IRX\n\n\
             [backtest]\nma_window = 30\ntrade_log = 4\n\n\
             [strategy.a]\nbuy_buffer = 0.02\nsell_buffer = 0.01\n\n\
             [strategy.b]\nbuy_buffer = 0\nsell_buffer = 0\n{}",
            dir.display(),
            extra
        )
    }

    fn run_cli(args: &[&str]) -> ExitCode {
        let mut argv = vec!["lrstrader"];
        argv.extend_from_slice(args);
        cli::run(Cli::parse_from(argv))
    }

    #[test]
    fn backtest_over_csv_files() {
        let dir = tempfile::TempDir::new().unwrap();
        write_data(dir.path());
        let ini = write_temp_ini(&ini_for(dir.path(), ""));

        let code = run_cli(&["backtest", "-c", ini.path().to_str().unwrap()]);
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::SUCCESS));
    }

    #[test]
    fn synthetic_backtest_exports_files() {
        let dir = tempfile::TempDir::new().unwrap();
        write_data(dir.path());
        let ini = write_temp_ini(&ini_for(dir.path(), ""));
        let export = dir.path().join("export");

        let code = run_cli(&[
            "backtest",
            "-c",
            ini.path().to_str().unwrap(),
            "--synthetic",
            "--export",
            export.to_str().unwrap(),
        ]);
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::SUCCESS));
        assert!(export.join("trades_01_a.csv").exists());
        assert!(export.join("equity_02_b.csv").exists());

        let spliced = CsvAdapter::new(export.clone())
            .fetch_closes("TQQQ_spliced", None, None)
            .unwrap();
        assert_eq!(spliced.len(), 400);
    }

    #[test]
    fn synthetic_command_writes_series() {
        let dir = tempfile::TempDir::new().unwrap();
        write_data(dir.path());
        let ini = write_temp_ini(&ini_for(dir.path(), ""));
        let output = dir.path().join("spliced.csv");
        let validation = dir.path().join("synthetic.csv");

        let code = run_cli(&[
            "synthetic",
            "-c",
            ini.path().to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--validation",
            validation.to_str().unwrap(),
        ]);
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::SUCCESS));

        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let spliced = adapter.fetch_closes("spliced", None, None).unwrap();
        let synthetic = adapter.fetch_closes("synthetic", None, None).unwrap();
        let real = adapter.fetch_closes("TQQQ", None, None).unwrap();

        assert_eq!(spliced.len(), 400);
        assert_eq!(synthetic.len(), 400);
        for p in real.points() {
            assert_eq!(spliced.close_on(p.date), Some(p.close));
        }
    }

    #[test]
    fn calibrate_and_info_succeed() {
        let dir = tempfile::TempDir::new().unwrap();
        write_data(dir.path());
        let ini = write_temp_ini(&ini_for(dir.path(), ""));
        let path = ini.path().to_str().unwrap();

        assert_eq!(
            exit_code_str(run_cli(&["calibrate", "-c", path])),
            exit_code_str(ExitCode::SUCCESS)
        );
        assert_eq!(
            exit_code_str(run_cli(&["info", "-c", path])),
            exit_code_str(ExitCode::SUCCESS)
        );
    }

    #[test]
    fn missing_data_file_exits_with_data_code() {
        let dir = tempfile::TempDir::new().unwrap();
        let ini = write_temp_ini(&ini_for(dir.path(), ""));

        let code = run_cli(&["backtest", "-c", ini.path().to_str().unwrap()]);
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::from(3)));
    }

    #[test]
    fn window_longer_than_history_exits_with_history_code() {
        let dir = tempfile::TempDir::new().unwrap();
        write_data(dir.path());
        let slow = "\n[strategy.slow]\nbuy_buffer = 0\nsell_buffer = 0\nma_window = 1000\n";
        let ini = write_temp_ini(&ini_for(dir.path(), slow));

        let code = run_cli(&["backtest", "-c", ini.path().to_str().unwrap()]);
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::from(5)));
    }

    #[test]
    fn cutover_outside_real_history_exits_with_alignment_code() {
        let dir = tempfile::TempDir::new().unwrap();
        write_data(dir.path());
        let ini = write_temp_ini(&ini_for(
            dir.path(),
            "\n[synthetic]\nenabled = true\ncutover_date = 2018-01-05\n",
        ));

        let code = run_cli(&["backtest", "-c", ini.path().to_str().unwrap()]);
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::from(4)));
    }
}
