//! Symbol universe: parsing symbol lists and loading their assets.

use crate::domain::error::QuantscreenError;
use crate::domain::quote::Asset;
use crate::ports::data_port::DataPort;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Split a comma list into trimmed, upper-cased, unique symbols.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoData,
    LoadFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct Universe {
    pub assets: Vec<Asset>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Load every symbol, skipping the ones without usable data.
///
/// Fails only when no symbol could be loaded.
pub fn load_universe(data_port: &dyn DataPort, symbols: &[String]) -> Result<Universe, QuantscreenError> {
    let mut assets = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let reason = match data_port.load_asset(symbol) {
            Ok(asset) if !asset.is_empty() => {
                info!(symbol = %symbol, bars = asset.len(), "loaded");
                assets.push(asset);
                continue;
            }
            Ok(_) | Err(QuantscreenError::NoData { .. }) => SkipReason::NoData,
            Err(e) => SkipReason::LoadFailed(e.to_string()),
        };
        warn!(symbol = %symbol, reason = ?reason, "skipping symbol");
        skipped.push(SkippedSymbol {
            symbol: symbol.clone(),
            reason,
        });
    }

    if assets.is_empty() {
        return Err(QuantscreenError::NoData {
            symbol: symbols.join(","),
        });
    }

    Ok(Universe { assets, skipped })
}
