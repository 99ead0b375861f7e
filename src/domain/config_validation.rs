//! Configuration validation.
//!
//! Validates all config fields before any data is read.

use crate::domain::error::LrsError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const STRATEGY_SECTION_PREFIX: &str = "strategy.";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), LrsError> {
    validate_data_config(config)?;
    validate_backtest_config(config)?;
    validate_synthetic_config(config)?;
    validate_strategy_sections(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), LrsError> {
    require_string(config, "data", "directory")?;
    require_string(config, "data", "underlying")?;
    require_string(config, "data", "leveraged")?;

    let start = optional_date(config, "data", "start_date")?;
    let end = optional_date(config, "data", "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(LrsError::config_invalid(
                "data",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), LrsError> {
    let capital = number(config, "backtest", "initial_capital", 10_000.0)?;
    if capital <= 0.0 {
        return Err(LrsError::config_invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    let window = integer(config, "backtest", "ma_window", 200)?;
    if window < 1 {
        return Err(LrsError::config_invalid(
            "backtest",
            "ma_window",
            "ma_window must be at least 1",
        ));
    }
    if integer(config, "backtest", "trade_log", 20)? < 0 {
        return Err(LrsError::config_invalid(
            "backtest",
            "trade_log",
            "trade_log must be non-negative",
        ));
    }
    Ok(())
}

pub fn validate_synthetic_config(config: &dyn ConfigPort) -> Result<(), LrsError> {
    if !config.get_bool("synthetic", "enabled", false) {
        return Ok(());
    }
    require_string(config, "data", "rates")?;

    positive(config, "synthetic", "leverage", 3.0)?;
    positive(config, "synthetic", "trading_days", 252.0)?;
    non_negative(config, "synthetic", "expense_ratio", 0.0095)?;
    non_negative(config, "synthetic", "rate_multiplier", 2.0)?;
    non_negative(config, "synthetic", "default_spread", 0.01)?;

    let min = non_negative(config, "synthetic", "spread_min", 0.0)?;
    let max = non_negative(config, "synthetic", "spread_max", 0.05)?;
    if max < min {
        return Err(LrsError::config_invalid(
            "synthetic",
            "spread_max",
            "spread_max must be >= spread_min",
        ));
    }
    if integer(config, "synthetic", "spread_samples", 501)? < 1 {
        return Err(LrsError::config_invalid(
            "synthetic",
            "spread_samples",
            "spread_samples must be at least 1",
        ));
    }
    optional_date(config, "synthetic", "cutover_date")?;
    Ok(())
}

pub fn validate_strategy_sections(config: &dyn ConfigPort) -> Result<(), LrsError> {
    for section in strategy_sections(config) {
        number(config, &section, "buy_buffer", 0.0)?;
        number(config, &section, "sell_buffer", 0.0)?;
        if config.get_string(&section, "buy_buffer").is_none() {
            return Err(LrsError::ConfigMissing {
                section,
                key: "buy_buffer".to_string(),
            });
        }
        if config.get_string(&section, "sell_buffer").is_none() {
            return Err(LrsError::ConfigMissing {
                section,
                key: "sell_buffer".to_string(),
            });
        }
        if integer(config, &section, "ma_window", 1)? < 1 {
            return Err(LrsError::config_invalid(
                &section,
                "ma_window",
                "ma_window must be at least 1",
            ));
        }
    }
    Ok(())
}

/// `[strategy.<id>]` sections in file order.
pub fn strategy_sections(config: &dyn ConfigPort) -> Vec<String> {
    config
        .sections()
        .into_iter()
        .filter(|s| s.starts_with(STRATEGY_SECTION_PREFIX))
        .collect()
}

fn require_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, LrsError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(LrsError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// A number, or `default` when the key is absent. Present but unparsable
/// values are errors rather than silently defaulted.
pub fn number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, LrsError> {
    match config.get_string(section, key).filter(|s| !s.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(LrsError::config_invalid(
                section,
                key,
                format!("{raw:?} is not a number"),
            )),
        },
    }
}

pub fn integer(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, LrsError> {
    match config.get_string(section, key).filter(|s| !s.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            LrsError::config_invalid(section, key, format!("{raw:?} is not an integer"))
        }),
    }
}

pub fn optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, LrsError> {
    match config.get_string(section, key).filter(|s| !s.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                LrsError::config_invalid(
                    section,
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}

fn positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, LrsError> {
    let value = number(config, section, key, default)?;
    if value <= 0.0 {
        return Err(LrsError::config_invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value)
}

fn non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, LrsError> {
    let value = number(config, section, key, default)?;
    if value < 0.0 {
        return Err(LrsError::config_invalid(
            section,
            key,
            format!("{key} must be non-negative"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const DATA: &str = "[data]\ndirectory = data\nunderlying = QQQ\nleveraged = TQQQ\nrates = IRX\n";

    #[test]
    fn minimal_config_passes() {
        assert!(validate_config(&make_config(DATA)).is_ok());
    }

    #[test]
    fn missing_underlying_fails() {
        let config = make_config("[data]\ndirectory = data\nleveraged = TQQQ\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, LrsError::ConfigMissing { key, .. } if key == "underlying"));
    }

    #[test]
    fn start_after_end_fails() {
        let config = make_config(&format!(
            "{DATA}start_date = 2024-01-01\nend_date = 2020-01-01\n"
        ));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, LrsError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn bad_date_format_fails() {
        let config = make_config(&format!("{DATA}start_date = 01/02/2020\n"));
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn initial_capital_must_be_positive() {
        let config = make_config(&format!("{DATA}[backtest]\ninitial_capital = 0\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, LrsError::ConfigInvalid { key, .. } if key == "initial_capital"));
    }

    #[test]
    fn non_numeric_capital_is_an_error_not_a_default() {
        let config = make_config(&format!("{DATA}[backtest]\ninitial_capital = lots\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, LrsError::ConfigInvalid { key, .. } if key == "initial_capital"));
    }

    #[test]
    fn ma_window_zero_fails() {
        let config = make_config(&format!("{DATA}[backtest]\nma_window = 0\n"));
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn synthetic_checked_only_when_enabled() {
        let disabled = make_config(&format!("{DATA}[synthetic]\nleverage = -3\n"));
        assert!(validate_config(&disabled).is_ok());

        let enabled = make_config(&format!("{DATA}[synthetic]\nenabled = true\nleverage = -3\n"));
        let err = validate_config(&enabled).unwrap_err();
        assert!(matches!(err, LrsError::ConfigInvalid { key, .. } if key == "leverage"));
    }

    #[test]
    fn synthetic_requires_rates_symbol() {
        let config = make_config(
            "[data]\ndirectory = d\nunderlying = QQQ\nleveraged = TQQQ\n[synthetic]\nenabled = true\n",
        );
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, LrsError::ConfigMissing { key, .. } if key == "rates"));
    }

    #[test]
    fn spread_interval_must_be_ordered() {
        let config = make_config(&format!(
            "{DATA}[synthetic]\nenabled = true\nspread_min = 0.04\nspread_max = 0.01\n"
        ));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, LrsError::ConfigInvalid { key, .. } if key == "spread_max"));
    }

    #[test]
    fn strategy_sections_need_both_buffers() {
        let config = make_config(&format!("{DATA}[strategy.a]\nbuy_buffer = 0.03\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, LrsError::ConfigMissing { key, .. } if key == "sell_buffer"));
    }

    #[test]
    fn strategy_sections_listed_in_order() {
        let config = make_config(&format!(
            "{DATA}[strategy.wide]\nbuy_buffer = 0.05\nsell_buffer = 0.03\n[strategy.none]\nbuy_buffer = 0\nsell_buffer = 0\n"
        ));
        assert!(validate_config(&config).is_ok());
        assert_eq!(strategy_sections(&config), vec!["strategy.wide", "strategy.none"]);
    }

    #[test]
    fn negative_buffers_are_valid() {
        let config = make_config(&format!(
            "{DATA}[strategy.inv]\nbuy_buffer = -0.01\nsell_buffer = -0.02\n"
        ));
        assert!(validate_config(&config).is_ok());
    }
}
