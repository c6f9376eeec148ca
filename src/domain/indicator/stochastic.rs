//! Stochastic oscillator.
//!
//! %K = 100 × (close - lowest low) / (highest high - lowest low) over k periods,
//! 50 when the range is flat. %D = SMA(d) of %K.

use std::fmt;

use crate::domain::error::RangeError;
use crate::domain::indicator::sma::{sma_at, sma_series};
use crate::domain::indicator::windowed_len;
use crate::domain::provider::{DataProvider, FieldSeries};
use crate::domain::series::{Direct, Series};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StochasticOutput {
    K,
    D,
}

impl StochasticOutput {
    pub const NAMES: &'static str = "k, d";

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "k" => Some(StochasticOutput::K),
            "d" => Some(StochasticOutput::D),
            _ => None,
        }
    }
}

impl fmt::Display for StochasticOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StochasticOutput::K => "k",
            StochasticOutput::D => "d",
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PercentK<'a> {
    high: FieldSeries<'a>,
    low: FieldSeries<'a>,
    close: FieldSeries<'a>,
    period: usize,
}

impl<'a> PercentK<'a> {
    pub fn new(provider: DataProvider<'a>, period: usize) -> Self {
        Self {
            high: provider.high(),
            low: provider.low(),
            close: provider.close(),
            period,
        }
    }
}

impl Series for PercentK<'_> {
    type Value = f64;

    fn len(&self) -> usize {
        windowed_len(self.close.len(), self.period)
    }

    fn value_at(&self, index: usize) -> Result<f64, RangeError> {
        RangeError::check(index, self.len())?;
        let mut highest = f64::NEG_INFINITY;
        let mut lowest = f64::INFINITY;
        for i in index..index + self.period {
            highest = highest.max(self.high.value_at(i)?);
            lowest = lowest.min(self.low.value_at(i)?);
        }
        let range = highest - lowest;
        if range == 0.0 {
            return Ok(50.0);
        }
        Ok(100.0 * (self.close.value_at(index)? - lowest) / range)
    }
}

pub fn stochastic_at(
    provider: DataProvider<'_>,
    k_period: usize,
    d_period: usize,
    output: StochasticOutput,
    index: usize,
) -> Result<f64, RangeError> {
    let k = PercentK::new(provider, k_period);
    match output {
        StochasticOutput::K => k.value_at(index),
        StochasticOutput::D => sma_at(&k, d_period, index),
    }
}

pub fn stochastic_series(
    provider: DataProvider<'_>,
    k_period: usize,
    d_period: usize,
    output: StochasticOutput,
) -> Result<Direct<f64>, RangeError> {
    let k = PercentK::new(provider, k_period);
    match output {
        StochasticOutput::K => k.to_vec().map(Direct::new),
        StochasticOutput::D => sma_series(&k, d_period),
    }
}
