//! Simple Moving Average: mean of the `period` values ending at each index.

use crate::domain::error::RangeError;
use crate::domain::indicator::{collect, window_mean, windowed_len};
use crate::domain::series::{Direct, Series};

pub fn sma_at<S>(source: &S, period: usize, index: usize) -> Result<f64, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    RangeError::check(index, windowed_len(source.len(), period))?;
    window_mean(source, index, period)
}

pub fn sma_series<S>(source: &S, period: usize) -> Result<Direct<f64>, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    collect(windowed_len(source.len(), period), |i| {
        window_mean(source, i, period)
    })
}
