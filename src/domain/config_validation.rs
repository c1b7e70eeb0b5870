//! Configuration validation.
//!
//! Validates all config fields before a backtest runs. Keys absent from the
//! `[strategy]` section fall back to the reference defaults.

use crate::domain::error::BreakoutError;
use crate::domain::lookback::{
    DEFAULT_CEILING, DEFAULT_FLOOR, DEFAULT_HISTORY_BARS, DEFAULT_LOOKBACK, MIN_WINDOW,
};
use crate::domain::trailing_stop::{DEFAULT_INITIAL_STOP_RISK, DEFAULT_TRAILING_STOP_RISK};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_MINUTES_AFTER_OPEN: i64 = 1;
/// Length of a regular US equity session.
const SESSION_MINUTES: i64 = 390;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BreakoutError> {
    require_parseable::<f64>(config, "backtest", "initial_capital")?;
    require_parseable::<i64>(config, "backtest", "minutes_after_open")?;
    validate_initial_capital(config)?;
    validate_dates(config)?;
    validate_symbol(config)?;
    validate_schedule(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BreakoutError> {
    for key in ["lookback", "floor", "ceiling", "history_bars"] {
        require_parseable::<i64>(config, "strategy", key)?;
    }
    for key in ["initial_stop_risk", "trailing_stop_risk", "allocation"] {
        require_parseable::<f64>(config, "strategy", key)?;
    }
    validate_lookback_bounds(config)?;
    validate_history_bars(config)?;
    validate_fraction(config, "initial_stop_risk", DEFAULT_INITIAL_STOP_RISK)?;
    validate_fraction(config, "trailing_stop_risk", DEFAULT_TRAILING_STOP_RISK)?;
    validate_fraction(config, "allocation", 1.0)?;
    Ok(())
}

/// The numeric getters fall back to their default on a malformed value, so
/// a present key must parse as `T` here.
fn require_parseable<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), BreakoutError> {
    match config.get_string(section, key) {
        Some(raw) if raw.trim().parse::<T>().is_err() => Err(BreakoutError::config_invalid(
            section,
            key,
            format!("{} is not a number: {:?}", key, raw.trim()),
        )),
        _ => Ok(()),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BreakoutError> {
    let value = config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if value <= 0.0 || !value.is_finite() {
        return Err(BreakoutError::config_invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BreakoutError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(BreakoutError::config_invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, BreakoutError> {
    match value {
        None => Err(BreakoutError::config_missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            BreakoutError::config_invalid(
                "backtest",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), BreakoutError> {
    match config.get_string("backtest", "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(BreakoutError::config_missing("backtest", "symbol")),
    }
}

fn validate_schedule(config: &dyn ConfigPort) -> Result<(), BreakoutError> {
    let value = config.get_int("backtest", "minutes_after_open", DEFAULT_MINUTES_AFTER_OPEN);
    if !(0..SESSION_MINUTES).contains(&value) {
        return Err(BreakoutError::config_invalid(
            "backtest",
            "minutes_after_open",
            format!("minutes_after_open must be within [0, {})", SESSION_MINUTES),
        ));
    }
    Ok(())
}

fn validate_lookback_bounds(config: &dyn ConfigPort) -> Result<(), BreakoutError> {
    let floor = config.get_int("strategy", "floor", DEFAULT_FLOOR as i64);
    let ceiling = config.get_int("strategy", "ceiling", DEFAULT_CEILING as i64);
    let lookback = config.get_int("strategy", "lookback", DEFAULT_LOOKBACK as i64);

    if floor < MIN_WINDOW as i64 {
        return Err(BreakoutError::config_invalid(
            "strategy",
            "floor",
            format!("floor must be at least {}", MIN_WINDOW),
        ));
    }
    if ceiling < floor {
        return Err(BreakoutError::config_invalid(
            "strategy",
            "ceiling",
            "ceiling must not be below floor",
        ));
    }
    if lookback < floor || lookback > ceiling {
        return Err(BreakoutError::config_invalid(
            "strategy",
            "lookback",
            format!("lookback must be within [{}, {}]", floor, ceiling),
        ));
    }
    Ok(())
}

fn validate_history_bars(config: &dyn ConfigPort) -> Result<(), BreakoutError> {
    let value = config.get_int("strategy", "history_bars", DEFAULT_HISTORY_BARS as i64);
    if value < 3 {
        return Err(BreakoutError::config_invalid(
            "strategy",
            "history_bars",
            "history_bars must be at least 3",
        ));
    }
    Ok(())
}

fn validate_fraction(config: &dyn ConfigPort, key: &str, default: f64) -> Result<(), BreakoutError> {
    let value = config.get_double("strategy", key, default);
    if !(value > 0.0 && value <= 1.0) {
        return Err(BreakoutError::config_invalid(
            "strategy",
            key,
            format!("{} must be in (0, 1]", key),
        ));
    }
    Ok(())
}
