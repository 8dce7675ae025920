//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use crate::domain::error::RuletraderError;
use crate::domain::strategy::Action;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    validate_ticker(config)?;
    validate_dates(config)?;
    validate_initial_cash(config)?;
    validate_commission(config)?;
    validate_sma_period(config)?;
    validate_sizing(config)?;
    Ok(())
}

pub fn validate_rule_config(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    validate_condition(config)?;
    validate_action(config, "then")?;
    validate_action(config, "else")?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> RuletraderError {
    RuletraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> RuletraderError {
    RuletraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// Read a float key. An absent key takes `default`; a present one must parse.
pub fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, RuletraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
            invalid(section, key, format!("expected a number, got '{}'", raw.trim()))
        }),
    }
}

/// Read an integer key. An absent key takes `default`; a present one must parse.
pub fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, RuletraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            invalid(section, key, format!("expected an integer, got '{}'", raw.trim()))
        }),
    }
}

fn validate_ticker(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    match config.get_string("backtest", "ticker") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(missing("backtest", "ticker")),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, RuletraderError> {
    let s = value.ok_or_else(|| missing("backtest", field))?;
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        invalid(
            "backtest",
            field,
            format!("invalid {} format, expected YYYY-MM-DD", field),
        )
    })
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    let value = read_double(config, "backtest", "initial_cash", 10_000.0)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    let value = read_double(config, "backtest", "commission", 0.001)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "commission",
            "commission must be in [0, 1)",
        ));
    }
    Ok(())
}

fn validate_sma_period(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    if config.get_string("backtest", "sma_period").is_none() {
        return Err(missing("backtest", "sma_period"));
    }
    let value = read_int(config, "backtest", "sma_period", 0)?;
    if value < 1 {
        return Err(invalid(
            "backtest",
            "sma_period",
            "sma_period must be a positive integer",
        ));
    }
    Ok(())
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    let sizing = config
        .get_string("backtest", "sizing")
        .unwrap_or_else(|| "all_in".to_string());

    match sizing.trim().to_lowercase().as_str() {
        "all_in" => Ok(()),
        "units" => {
            if read_int(config, "backtest", "sizing_units", 1)? < 1 {
                return Err(invalid(
                    "backtest",
                    "sizing_units",
                    "sizing_units must be at least 1",
                ));
            }
            Ok(())
        }
        "fraction" => {
            let f = read_double(config, "backtest", "sizing_fraction", 1.0)?;
            if !(f > 0.0 && f <= 1.0) {
                return Err(invalid(
                    "backtest",
                    "sizing_fraction",
                    "sizing_fraction must be in (0, 1]",
                ));
            }
            Ok(())
        }
        other => Err(invalid(
            "backtest",
            "sizing",
            format!("unknown sizing '{}' (expected all_in, units or fraction)", other),
        )),
    }
}

fn validate_condition(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    match config.get_string("rule", "if_condition") {
        Some(s) if s.trim().is_empty() => Err(invalid(
            "rule",
            "if_condition",
            "if_condition must not be empty",
        )),
        _ => Ok(()),
    }
}

fn validate_action(config: &dyn ConfigPort, key: &str) -> Result<(), RuletraderError> {
    if let Some(token) = config.get_string("rule", key) {
        token
            .parse::<Action>()
            .map_err(|e| invalid("rule", key, e.to_string()))?;
    }
    Ok(())
}
