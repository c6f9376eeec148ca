//! Technical indicator kernels.
//!
//! Every indicator exposes two entry points over a source [`Series`]: a
//! single-index read (`*_at`) and a full-series build (`*_series`). Both run
//! the same arithmetic in the same order, so they agree bit-for-bit at every
//! shared index; they differ only in how far they walk.
//!
//! Indices follow the series convention (0 = newest). An indicator with a
//! window of `period` values is defined on `source.len() - period + 1` indices;
//! reading past that is a [`RangeError`].

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod sma;
pub mod stochastic;

use crate::domain::error::RangeError;
use crate::domain::series::{Direct, Series};

/// Length of a series produced by a `period`-wide window over `source_len` values.
pub fn windowed_len(source_len: usize, period: usize) -> usize {
    if period == 0 || source_len < period {
        0
    } else {
        source_len - period + 1
    }
}

/// Mean of `source[index..index + period]`.
pub(crate) fn window_mean<S>(source: &S, index: usize, period: usize) -> Result<f64, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    let mut sum = 0.0;
    for i in index..index + period {
        sum += source.value_at(i)?;
    }
    Ok(sum / period as f64)
}

/// Recursive smoothing applied after the seed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Smoothing {
    /// `(prev * (n - 1) + x) / n`
    Wilder,
    /// `x * k + prev * (1 - k)` with `k = 2 / (n + 1)`
    Exponential,
}

impl Smoothing {
    fn step(self, prev: f64, x: f64, period: usize) -> f64 {
        match self {
            Smoothing::Wilder => (prev * (period - 1) as f64 + x) / period as f64,
            Smoothing::Exponential => {
                let k = 2.0 / (period as f64 + 1.0);
                x * k + prev * (1.0 - k)
            }
        }
    }
}

/// Seed with the mean of the oldest `period` values, then smooth toward newer
/// indices down to `stop`, passing each `(index, value)` to `emit`.
fn smooth_walk<S>(
    source: &S,
    period: usize,
    smoothing: Smoothing,
    stop: usize,
    mut emit: impl FnMut(usize, f64),
) -> Result<(), RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    let len = windowed_len(source.len(), period);
    RangeError::check(stop, len)?;

    let seed_index = len - 1;
    let mut value = window_mean(source, seed_index, period)?;
    emit(seed_index, value);

    for i in (stop..seed_index).rev() {
        value = smoothing.step(value, source.value_at(i)?, period);
        emit(i, value);
    }
    Ok(())
}

pub(crate) fn smoothed_at<S>(
    source: &S,
    period: usize,
    smoothing: Smoothing,
    index: usize,
) -> Result<f64, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    let mut last = f64::NAN;
    smooth_walk(source, period, smoothing, index, |_, v| last = v)?;
    Ok(last)
}

pub(crate) fn smoothed_series<S>(
    source: &S,
    period: usize,
    smoothing: Smoothing,
) -> Result<Direct<f64>, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    let len = windowed_len(source.len(), period);
    if len == 0 {
        return Ok(Direct::empty());
    }
    let mut values = vec![0.0; len];
    smooth_walk(source, period, smoothing, 0, |i, v| values[i] = v)?;
    Ok(Direct::new(values))
}

/// Build a full series by reading each index of a windowed indicator.
pub(crate) fn collect<F>(len: usize, mut read: F) -> Result<Direct<f64>, RangeError>
where
    F: FnMut(usize) -> Result<f64, RangeError>,
{
    (0..len).map(&mut read).collect::<Result<Vec<_>, _>>().map(Direct::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Direct<f64> {
        Direct::from_chronological(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
    }

    #[test]
    fn windowed_len_edges() {
        assert_eq!(windowed_len(10, 3), 8);
        assert_eq!(windowed_len(3, 3), 1);
        assert_eq!(windowed_len(2, 3), 0);
        assert_eq!(windowed_len(5, 0), 0);
    }

    #[test]
    fn window_mean_reads_older_values() {
        // newest first: 6 5 4 3 2 1
        assert_eq!(window_mean(&source(), 0, 3), Ok(5.0));
        assert_eq!(window_mean(&source(), 3, 3), Ok(2.0));
        assert!(window_mean(&source(), 4, 3).is_err());
    }

    #[test]
    fn wilder_seed_then_smooth() {
        let s = smoothed_series(&source(), 3, Smoothing::Wilder).unwrap();
        assert_eq!(s.len(), 4);
        // seed at index 3: mean(1, 2, 3) = 2
        assert_eq!(s.value_at(3), Ok(2.0));
        // index 2: (2 * 2 + 4) / 3
        assert!((s.value_at(2).unwrap() - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn single_index_matches_full_series() {
        for smoothing in [Smoothing::Wilder, Smoothing::Exponential] {
            let full = smoothed_series(&source(), 3, smoothing).unwrap();
            for i in 0..full.len() {
                let single = smoothed_at(&source(), 3, smoothing, i).unwrap();
                assert_eq!(single.to_bits(), full.value_at(i).unwrap().to_bits());
            }
        }
    }

    #[test]
    fn smoothing_past_lookback_is_range_error() {
        assert_eq!(
            smoothed_at(&source(), 3, Smoothing::Exponential, 4),
            Err(RangeError::new(4, 4))
        );
        assert_eq!(smoothed_series(&source(), 7, Smoothing::Wilder).unwrap().len(), 0);
    }
}
