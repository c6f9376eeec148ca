//! Data provider and snapshots over a borrowed [`Asset`].
//!
//! A [`DataProvider`] exposes an asset's OHLCV fields as series without
//! copying. A [`Snapshot`] pins one index of a provider: the "now" of a single
//! evaluation step. Yesterday is the snapshot at `index + 1`.

use std::collections::HashMap;
use std::fmt;

use crate::domain::error::RangeError;
use crate::domain::method::Method;
use crate::domain::quote::{Asset, Quote};
use crate::domain::series::{AnySeries, Series};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl PriceField {
    pub const ALL: [PriceField; 5] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::Volume,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "open" => Some(PriceField::Open),
            "high" => Some(PriceField::High),
            "low" => Some(PriceField::Low),
            "close" => Some(PriceField::Close),
            "volume" => Some(PriceField::Volume),
            _ => None,
        }
    }

    pub fn read(self, quote: &Quote) -> f64 {
        match self {
            PriceField::Open => quote.open,
            PriceField::High => quote.high,
            PriceField::Low => quote.low,
            PriceField::Close => quote.close,
            PriceField::Volume => quote.volume as f64,
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Volume => "volume",
        };
        f.write_str(name)
    }
}

/// One OHLCV field of an asset, read straight from its quotes.
#[derive(Debug, Clone, Copy)]
pub struct FieldSeries<'a> {
    asset: &'a Asset,
    field: PriceField,
}

impl Series for FieldSeries<'_> {
    type Value = f64;

    fn len(&self) -> usize {
        self.asset.len()
    }

    fn value_at(&self, index: usize) -> Result<f64, RangeError> {
        self.asset
            .quote(index)
            .map(|q| self.field.read(q))
            .ok_or(RangeError::new(index, self.asset.len()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DataProvider<'a> {
    asset: &'a Asset,
}

impl<'a> DataProvider<'a> {
    pub fn new(asset: &'a Asset) -> Self {
        Self { asset }
    }

    pub fn asset(&self) -> &'a Asset {
        self.asset
    }

    pub fn len(&self) -> usize {
        self.asset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asset.is_empty()
    }

    pub fn field(&self, field: PriceField) -> FieldSeries<'a> {
        FieldSeries {
            asset: self.asset,
            field,
        }
    }

    pub fn high(&self) -> FieldSeries<'a> {
        self.field(PriceField::High)
    }

    pub fn low(&self) -> FieldSeries<'a> {
        self.field(PriceField::Low)
    }

    pub fn close(&self) -> FieldSeries<'a> {
        self.field(PriceField::Close)
    }

    pub fn volume(&self) -> FieldSeries<'a> {
        self.field(PriceField::Volume)
    }

    pub fn snapshot(&self, index: usize) -> Result<Snapshot<'a>, RangeError> {
        RangeError::check(index, self.len())?;
        Ok(Snapshot {
            provider: *self,
            precomputed: None,
            index,
        })
    }
}

/// Full series of methods evaluated once per asset, keyed structurally.
#[derive(Debug, Default)]
pub struct Precomputed<'a> {
    series: HashMap<Method, AnySeries<'a>>,
}

impl<'a> Precomputed<'a> {
    pub fn build<'m>(
        provider: DataProvider<'a>,
        methods: impl IntoIterator<Item = &'m Method>,
    ) -> Result<Self, RangeError> {
        let mut series = HashMap::new();
        for method in methods {
            if !series.contains_key(method) {
                series.insert(method.clone(), method.evaluate(provider)?);
            }
        }
        Ok(Self { series })
    }

    pub fn get(&self, method: &Method) -> Option<&AnySeries<'a>> {
        self.series.get(method)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// A fixed index over a provider.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    provider: DataProvider<'a>,
    precomputed: Option<&'a Precomputed<'a>>,
    index: usize,
}

impl<'a> Snapshot<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn provider(&self) -> DataProvider<'a> {
        self.provider
    }

    /// Read methods from `precomputed` when present there.
    pub fn with_precomputed(self, precomputed: &'a Precomputed<'a>) -> Self {
        Self {
            precomputed: Some(precomputed),
            ..self
        }
    }

    pub fn quote(&self) -> &'a Quote {
        match self.provider.asset().quote(self.index) {
            Some(quote) => quote,
            None => panic!(
                "invariant violated: snapshot index {} outside asset of length {}",
                self.index,
                self.provider.len()
            ),
        }
    }

    pub fn close(&self) -> f64 {
        self.quote().close
    }

    /// The snapshot one period older, sharing the same precomputed store.
    pub fn previous(&self) -> Result<Snapshot<'a>, RangeError> {
        let prev = self.provider.snapshot(self.index + 1)?;
        Ok(Snapshot {
            precomputed: self.precomputed,
            ..prev
        })
    }

    /// Value of `method` at this snapshot's index.
    pub fn value(&self, method: &Method) -> Result<f64, RangeError> {
        match self.precomputed.and_then(|p| p.get(method)) {
            Some(series) => series.value_at(self.index),
            None => method.value_at(self.provider, self.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::Quote;
    use chrono::{Duration, NaiveDate};

    fn asset(closes: &[f64]) -> Asset {
        let quotes = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Quote {
                timestamp: (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: close - 1.0,
                high: close + 2.0,
                low: close - 2.0,
                close,
                volume: 1000 + i as i64,
            })
            .collect();
        Asset::new("TEST", quotes)
    }

    #[test]
    fn price_field_parse_round_trip() {
        for field in PriceField::ALL {
            assert_eq!(PriceField::parse(&field.to_string()), Some(field));
        }
        assert_eq!(PriceField::parse("adj_close"), None);
    }

    #[test]
    fn field_series_reads_without_copying() {
        let a = asset(&[10.0, 11.0, 12.0]);
        let provider = DataProvider::new(&a);
        let close = provider.close();
        assert_eq!(close.len(), 3);
        assert_eq!(close.value_at(0), Ok(12.0));
        assert_eq!(close.value_at(2), Ok(10.0));
        assert_eq!(provider.volume().value_at(0), Ok(1002.0));
        assert_eq!(provider.high().value_at(1), Ok(13.0));
        assert!(close.value_at(3).is_err());
    }

    #[test]
    fn snapshot_out_of_range_is_error() {
        let a = asset(&[10.0, 11.0]);
        let provider = DataProvider::new(&a);
        assert!(provider.snapshot(1).is_ok());
        assert_eq!(provider.snapshot(2).unwrap_err(), RangeError::new(2, 2));
    }

    #[test]
    fn previous_is_one_period_older() {
        let a = asset(&[10.0, 11.0, 12.0]);
        let provider = DataProvider::new(&a);
        let today = provider.snapshot(0).unwrap();
        let yesterday = today.previous().unwrap();
        assert_eq!(today.close(), 12.0);
        assert_eq!(yesterday.index(), 1);
        assert_eq!(yesterday.close(), 11.0);
        assert!(provider.snapshot(2).unwrap().previous().is_err());
    }

    #[test]
    fn precomputed_and_direct_reads_agree() {
        let a = asset(&[10.0, 11.0, 9.0, 12.0, 15.0, 14.0]);
        let provider = DataProvider::new(&a);
        let atr = Method::Atr { period: 2 };
        let store = Precomputed::build(provider, [&atr, &atr]).unwrap();
        assert_eq!(store.len(), 1);

        for index in 0..provider.len() {
            let plain = provider.snapshot(index).unwrap();
            let cached = plain.with_precomputed(&store);
            assert_eq!(plain.value(&atr), cached.value(&atr));
        }
    }
}
