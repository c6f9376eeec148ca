//! Configuration validation.
//!
//! Every accessor reports failures with `[section] key` context so that the
//! CLI can reject a config file before loading any data.

use crate::domain::compiler::DEFAULT_MAX_DEPTH;
use crate::domain::error::QuantscreenError;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

pub const MAX_DEPTH_LIMIT: usize = 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> QuantscreenError {
    QuantscreenError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, QuantscreenError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(QuantscreenError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

pub fn data_dir(config: &dyn ConfigPort) -> Result<PathBuf, QuantscreenError> {
    required(config, "data", "dir").map(PathBuf::from)
}

/// `[backtest] symbols`, or `None` when unset (use every available symbol).
pub fn symbols(config: &dyn ConfigPort) -> Result<Option<Vec<String>>, QuantscreenError> {
    match config.get_string("backtest", "symbols") {
        None => Ok(None),
        Some(list) => parse_symbols(&list)
            .map(Some)
            .map_err(|e| invalid("backtest", "symbols", e.to_string())),
    }
}

pub fn strategy_path(config: &dyn ConfigPort) -> Result<PathBuf, QuantscreenError> {
    required(config, "backtest", "strategy").map(PathBuf::from)
}

pub fn max_depth(config: &dyn ConfigPort) -> Result<usize, QuantscreenError> {
    let depth = config.get_int("backtest", "max_depth", DEFAULT_MAX_DEPTH as i64);
    match usize::try_from(depth) {
        Ok(depth) if (1..=MAX_DEPTH_LIMIT).contains(&depth) => Ok(depth),
        _ => Err(invalid(
            "backtest",
            "max_depth",
            format!("max_depth must be an integer between 1 and {}", MAX_DEPTH_LIMIT),
        )),
    }
}

pub fn log_level(config: &dyn ConfigPort) -> Result<String, QuantscreenError> {
    let level = config
        .get_string("logging", "level")
        .map(|l| l.trim().to_lowercase())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    if LOG_LEVELS.contains(&level.as_str()) {
        Ok(level)
    } else {
        Err(invalid(
            "logging",
            "level",
            format!("level must be one of {}", LOG_LEVELS.join(", ")),
        ))
    }
}

/// Keys shared by every data-reading command.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), QuantscreenError> {
    data_dir(config)?;
    symbols(config)?;
    log_level(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), QuantscreenError> {
    validate_data_config(config)?;
    strategy_path(config)?;
    max_depth(config)?;
    Ok(())
}
