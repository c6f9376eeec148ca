//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).

use std::fmt;

use crate::domain::error::RangeError;
use crate::domain::indicator::{collect, window_mean, windowed_len};
use crate::domain::series::{Direct, Series};

pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BollingerOutput {
    Upper,
    Middle,
    Lower,
}

impl BollingerOutput {
    pub const NAMES: &'static str = "upper, middle, lower";

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "upper" => Some(BollingerOutput::Upper),
            "middle" => Some(BollingerOutput::Middle),
            "lower" => Some(BollingerOutput::Lower),
            _ => None,
        }
    }
}

impl fmt::Display for BollingerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BollingerOutput::Upper => "upper",
            BollingerOutput::Middle => "middle",
            BollingerOutput::Lower => "lower",
        })
    }
}

fn band<S>(
    source: &S,
    period: usize,
    multiplier: f64,
    output: BollingerOutput,
    index: usize,
) -> Result<f64, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    let middle = window_mean(source, index, period)?;
    if output == BollingerOutput::Middle {
        return Ok(middle);
    }

    let mut variance = 0.0;
    for i in index..index + period {
        let diff = source.value_at(i)? - middle;
        variance += diff * diff;
    }
    let stddev = (variance / period as f64).sqrt();

    Ok(match output {
        BollingerOutput::Upper => middle + multiplier * stddev,
        BollingerOutput::Lower => middle - multiplier * stddev,
        BollingerOutput::Middle => middle,
    })
}

pub fn bollinger_at<S>(
    source: &S,
    period: usize,
    multiplier: f64,
    output: BollingerOutput,
    index: usize,
) -> Result<f64, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    RangeError::check(index, windowed_len(source.len(), period))?;
    band(source, period, multiplier, output, index)
}

pub fn bollinger_series<S>(
    source: &S,
    period: usize,
    multiplier: f64,
    output: BollingerOutput,
) -> Result<Direct<f64>, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    collect(windowed_len(source.len(), period), |i| {
        band(source, period, multiplier, output, i)
    })
}
