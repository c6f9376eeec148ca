//! Average True Range with Wilder smoothing.
//!
//! TR[i] = max(high[i] - low[i], |high[i] - close[i+1]|, |low[i] - close[i+1]|)
//!
//! The oldest quote has no previous close, so the true-range series is one
//! shorter than the asset. ATR seeds with the mean of the `period` oldest TR
//! values and then applies ATR[i] = (ATR[i+1] * (n - 1) + TR[i]) / n.
//! Defined on `len - period` indices.

use crate::domain::error::RangeError;
use crate::domain::indicator::{smoothed_at, smoothed_series, Smoothing};
use crate::domain::provider::{DataProvider, FieldSeries};
use crate::domain::quote::true_range;
use crate::domain::series::{Direct, Series, SubRange};

#[derive(Debug, Clone)]
pub struct TrueRange<'a> {
    high: FieldSeries<'a>,
    low: FieldSeries<'a>,
    prev_close: SubRange<FieldSeries<'a>>,
}

impl<'a> TrueRange<'a> {
    pub fn new(provider: DataProvider<'a>) -> Self {
        Self {
            high: provider.high(),
            low: provider.low(),
            prev_close: SubRange::skip(provider.close(), 1),
        }
    }
}

impl Series for TrueRange<'_> {
    type Value = f64;

    fn len(&self) -> usize {
        self.prev_close.len()
    }

    fn value_at(&self, index: usize) -> Result<f64, RangeError> {
        RangeError::check(index, self.len())?;
        Ok(true_range(
            self.high.value_at(index)?,
            self.low.value_at(index)?,
            self.prev_close.value_at(index)?,
        ))
    }
}

pub fn atr_at(provider: DataProvider<'_>, period: usize, index: usize) -> Result<f64, RangeError> {
    smoothed_at(&TrueRange::new(provider), period, Smoothing::Wilder, index)
}

pub fn atr_series(provider: DataProvider<'_>, period: usize) -> Result<Direct<f64>, RangeError> {
    smoothed_series(&TrueRange::new(provider), period, Smoothing::Wilder)
}
