//! CSV file data adapter.
//!
//! One file per symbol, `<SYMBOL>.csv`, with a header row and the columns
//! `timestamp,open,high,low,close,volume`.

use crate::domain::error::QuantscreenError;
use crate::domain::quote::{Asset, Quote};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn data_error(reason: String) -> QuantscreenError {
    QuantscreenError::Data { reason }
}

/// Accepts `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn column<T>(record: &csv::StringRecord, index: usize, name: &str, line: u64) -> Result<T, QuantscreenError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| data_error(format!("line {}: missing {} column", line, name)))?
        .trim()
        .parse()
        .map_err(|e| data_error(format!("line {}: invalid {} value: {}", line, name, e)))
}

impl DataPort for CsvAdapter {
    fn load_asset(&self, symbol: &str) -> Result<Asset, QuantscreenError> {
        let path = self.csv_path(symbol);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(QuantscreenError::NoData {
                    symbol: symbol.to_string(),
                });
            }
            Err(e) => {
                return Err(data_error(format!("failed to read {}: {}", path.display(), e)));
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut quotes = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("{}: CSV parse error: {}", path.display(), e)))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let raw_timestamp = record
                .get(0)
                .ok_or_else(|| data_error(format!("line {}: missing timestamp column", line)))?;
            let timestamp = parse_timestamp(raw_timestamp).ok_or_else(|| {
                data_error(format!("line {}: invalid timestamp '{}'", line, raw_timestamp))
            })?;

            quotes.push(Quote {
                timestamp,
                open: column(&record, 1, "open", line)?,
                high: column(&record, 2, "high", line)?,
                low: column(&record, 3, "low", line)?,
                close: column(&record, 4, "close", line)?,
                volume: column(&record, 5, "volume", line)?,
            });
        }

        Ok(Asset::new(symbol, quotes))
    }

    fn list_symbols(&self) -> Result<Vec<String>, QuantscreenError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
