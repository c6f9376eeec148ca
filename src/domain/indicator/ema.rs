//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the SMA of the oldest window, then
//! EMA[i] = X[i]*k + EMA[i+1]*(1-k). Defined on `len - n + 1` indices.

use crate::domain::error::RangeError;
use crate::domain::indicator::{smoothed_at, smoothed_series, Smoothing};
use crate::domain::series::{Direct, Series};

pub fn ema_at<S>(source: &S, period: usize, index: usize) -> Result<f64, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    smoothed_at(source, period, Smoothing::Exponential, index)
}

pub fn ema_series<S>(source: &S, period: usize) -> Result<Direct<f64>, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    smoothed_series(source, period, Smoothing::Exponential)
}
