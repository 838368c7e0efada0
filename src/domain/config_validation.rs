//! Configuration validation.
//!
//! Checks the `[run]`, `[backtest]` and `[optimizer]` sections before any data is read.

use crate::domain::error::AlgoedgeError;
use crate::domain::metrics::MetricsSnapshot;
use crate::ports::config_port::ConfigPort;

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    validate_non_empty(config, "run", "symbol")?;
    validate_non_empty(config, "run", "timeframe")?;
    validate_years(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    validate_initial_cash(config)?;
    validate_risk_free_rate(config)?;
    validate_periods_per_year(config)?;
    Ok(())
}

pub fn validate_optimizer_config(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    validate_samples(config)?;
    validate_seed(config)?;
    validate_workers(config)?;
    validate_objective(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> AlgoedgeError {
    AlgoedgeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// A key that is present must also be non-empty; absent keys fall back to defaults.
fn validate_non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), AlgoedgeError> {
    match config.get_string(section, key) {
        Some(s) if s.trim().is_empty() => Err(AlgoedgeError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_years(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    if config.get_int("run", "years", 2) < 0 {
        return Err(invalid("run", "years", "years must be non-negative"));
    }
    Ok(())
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    let value = config.get_double("backtest", "initial_cash", 10_000.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(invalid("backtest", "initial_cash", "initial_cash must be positive"));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    let value = config.get_int("backtest", "periods_per_year", 252);
    if value <= 0 || value > u32::MAX as i64 {
        return Err(invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_samples(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    if config.get_int("optimizer", "samples", 25) <= 0 {
        return Err(invalid("optimizer", "samples", "samples must be positive"));
    }
    Ok(())
}

fn validate_seed(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    if config.get_int("optimizer", "seed", 42) < 0 {
        return Err(invalid("optimizer", "seed", "seed must be non-negative"));
    }
    Ok(())
}

fn validate_workers(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    if config.get_int("optimizer", "workers", 0) < 0 {
        return Err(invalid("optimizer", "workers", "workers must be non-negative"));
    }
    Ok(())
}

fn validate_objective(config: &dyn ConfigPort) -> Result<(), AlgoedgeError> {
    match config.get_string("optimizer", "objective") {
        Some(name) if !MetricsSnapshot::is_known(name.trim()) => Err(invalid(
            "optimizer",
            "objective",
            &format!(
                "unknown metric '{}', expected one of {}",
                name.trim(),
                MetricsSnapshot::NAMES.join(", ")
            ),
        )),
        _ => Ok(()),
    }
}
