//! Screening: evaluate one filter at the newest quote of many assets.

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::error::RangeError;
use crate::domain::filter::Filter;
use crate::domain::provider::DataProvider;
use crate::domain::quote::Asset;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreenResult {
    pub passed: Vec<String>,
    pub rejected: Vec<String>,
    /// Assets the filter could not be evaluated on.
    pub ineligible: Vec<ScreenFailure>,
}

fn evaluate_latest(asset: &Asset, filter: &Filter) -> Result<bool, RangeError> {
    let snapshot = DataProvider::new(asset).snapshot(0)?;
    filter.evaluate(&snapshot)
}

pub fn screen(assets: &[Asset], filter: &Filter) -> ScreenResult {
    let mut result = ScreenResult::default();

    for asset in assets {
        let symbol = asset.symbol().to_string();
        match evaluate_latest(asset, filter) {
            Ok(true) => result.passed.push(symbol),
            Ok(false) => result.rejected.push(symbol),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "asset ineligible for screen");
                result.ineligible.push(ScreenFailure {
                    symbol,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        passed = result.passed.len(),
        rejected = result.rejected.len(),
        ineligible = result.ineligible.len(),
        "screen complete"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::CompareOp;
    use crate::domain::method::Method;
    use crate::domain::provider::PriceField;
    use crate::domain::quote::Quote;
    use chrono::{Duration, NaiveDate};

    fn asset(symbol: &str, closes: &[f64]) -> Asset {
        let quotes = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Quote {
                timestamp: (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000,
            })
            .collect();
        Asset::new(symbol, quotes)
    }

    #[test]
    fn splits_assets_by_outcome() {
        let assets = vec![
            asset("UP", &[90.0, 110.0]),
            asset("DOWN", &[110.0, 90.0]),
            asset("EMPTY", &[]),
            asset("SHORT", &[120.0]),
        ];
        let filter = Filter::And(vec![
            Filter::compare(CompareOp::Gt, Method::Field(PriceField::Close), Method::value(100.0)),
            Filter::compare(CompareOp::Gt, Method::Atr { period: 1 }, Method::value(0.0)),
        ]);
        let result = screen(&assets, &filter);
        assert_eq!(result.passed, vec!["UP"]);
        assert_eq!(result.rejected, vec!["DOWN"]);
        let ineligible: Vec<&str> = result.ineligible.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(ineligible, vec!["EMPTY", "SHORT"]);
    }
}
