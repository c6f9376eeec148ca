#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use quantscreen::domain::error::QuantscreenError;
pub use quantscreen::domain::quote::{Asset, Quote};
use quantscreen::ports::data_port::DataPort;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct MockDataPort {
    pub assets: HashMap<String, Asset>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.insert(asset.symbol().to_string(), asset);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_asset(&self, symbol: &str) -> Result<Asset, QuantscreenError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(QuantscreenError::Data {
                reason: reason.clone(),
            });
        }
        self.assets
            .get(symbol)
            .cloned()
            .ok_or_else(|| QuantscreenError::NoData {
                symbol: symbol.to_string(),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, QuantscreenError> {
        let mut symbols: Vec<String> = self.assets.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Midnight of the `day`-th day after 2024-01-01.
pub fn day(day: usize) -> NaiveDateTime {
    (date(2024, 1, 1) + chrono::Duration::days(day as i64))
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_quote(day_offset: usize, open: f64, high: f64, low: f64, close: f64) -> Quote {
    Quote {
        timestamp: day(day_offset),
        open,
        high,
        low,
        close,
        volume: 1000 + day_offset as i64,
    }
}

/// Quotes with `high = close + 1`, `low = close - 1`, oldest first.
pub fn make_asset(symbol: &str, closes: &[f64]) -> Asset {
    let quotes = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_quote(i, close, close + 1.0, close - 1.0, close))
        .collect();
    Asset::new(symbol, quotes)
}

/// Quotes from `(high, low, close)` triples, oldest first.
pub fn make_hlc_asset(symbol: &str, hlc: &[(f64, f64, f64)]) -> Asset {
    let quotes = hlc
        .iter()
        .enumerate()
        .map(|(i, &(high, low, close))| make_quote(i, close, high, low, close))
        .collect();
    Asset::new(symbol, quotes)
}

/// Write `<dir>/<SYMBOL>.csv` in the layout the CSV adapter reads.
pub fn write_csv(dir: &Path, symbol: &str, closes: &[f64]) {
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for (i, close) in closes.iter().enumerate() {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            day(i).format("%Y-%m-%d"),
            close,
            close + 1.0,
            close - 1.0,
            close,
            1000 + i
        ));
    }
    fs::write(dir.join(format!("{}.csv", symbol)), content).unwrap();
}
