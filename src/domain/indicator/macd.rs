//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9

use std::fmt;

use crate::domain::error::RangeError;
use crate::domain::indicator::ema::{ema_at, ema_series};
use crate::domain::series::{Direct, Series};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacdOutput {
    Line,
    Signal,
    Histogram,
}

impl MacdOutput {
    pub const NAMES: &'static str = "line, signal, histogram";

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "line" => Some(MacdOutput::Line),
            "signal" => Some(MacdOutput::Signal),
            "histogram" => Some(MacdOutput::Histogram),
            _ => None,
        }
    }
}

impl fmt::Display for MacdOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MacdOutput::Line => "line",
            MacdOutput::Signal => "signal",
            MacdOutput::Histogram => "histogram",
        })
    }
}

/// EMA(fast) - EMA(slow), over the indices where both are defined.
#[derive(Debug, Clone)]
pub struct MacdLine {
    fast: Direct<f64>,
    slow: Direct<f64>,
}

impl MacdLine {
    pub fn new<S>(source: &S, fast: usize, slow: usize) -> Result<Self, RangeError>
    where
        S: Series<Value = f64> + ?Sized,
    {
        Ok(Self {
            fast: ema_series(source, fast)?,
            slow: ema_series(source, slow)?,
        })
    }
}

impl Series for MacdLine {
    type Value = f64;

    fn len(&self) -> usize {
        self.fast.len().min(self.slow.len())
    }

    fn value_at(&self, index: usize) -> Result<f64, RangeError> {
        RangeError::check(index, self.len())?;
        Ok(self.fast.value_at(index)? - self.slow.value_at(index)?)
    }
}

pub fn macd_at<S>(
    source: &S,
    fast: usize,
    slow: usize,
    signal: usize,
    output: MacdOutput,
    index: usize,
) -> Result<f64, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    let line = MacdLine::new(source, fast, slow)?;
    match output {
        MacdOutput::Line => line.value_at(index),
        MacdOutput::Signal => ema_at(&line, signal, index),
        MacdOutput::Histogram => {
            let signal_value = ema_at(&line, signal, index)?;
            Ok(line.value_at(index)? - signal_value)
        }
    }
}

pub fn macd_series<S>(
    source: &S,
    fast: usize,
    slow: usize,
    signal: usize,
    output: MacdOutput,
) -> Result<Direct<f64>, RangeError>
where
    S: Series<Value = f64> + ?Sized,
{
    let line = MacdLine::new(source, fast, slow)?;
    match output {
        MacdOutput::Line => line.to_vec().map(Direct::new),
        MacdOutput::Signal => ema_series(&line, signal),
        MacdOutput::Histogram => {
            let signal_line = ema_series(&line, signal)?;
            let mut values = Vec::with_capacity(signal_line.len());
            for (i, &s) in signal_line.as_slice().iter().enumerate() {
                values.push(line.value_at(i)? - s);
            }
            Ok(Direct::new(values))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending(n: usize) -> Direct<f64> {
        Direct::from_chronological((0..n).map(|i| 100.0 + i as f64).collect())
    }

    #[test]
    fn macd_lengths_follow_lookback() {
        let s = trending(40);
        let line = macd_series(&s, 12, 26, 9, MacdOutput::Line).unwrap();
        let signal = macd_series(&s, 12, 26, 9, MacdOutput::Signal).unwrap();
        let hist = macd_series(&s, 12, 26, 9, MacdOutput::Histogram).unwrap();
        assert_eq!(line.len(), 15);
        assert_eq!(signal.len(), 7);
        assert_eq!(hist.len(), 7);
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let s = trending(40);
        let line = macd_series(&s, 12, 26, 9, MacdOutput::Line).unwrap();
        for v in line.to_vec().unwrap() {
            assert!(v > 0.0);
        }
    }

    #[test]
    fn macd_constant_prices_are_zero() {
        let s = Direct::new(vec![50.0; 20]);
        for output in [MacdOutput::Line, MacdOutput::Signal, MacdOutput::Histogram] {
            let v = macd_at(&s, 3, 6, 3, output, 0).unwrap();
            assert!(v.abs() < 1e-9);
        }
    }

    #[test]
    fn histogram_is_line_minus_signal() {
        let s = Direct::from_chronological(vec![
            10.0, 11.0, 10.5, 12.0, 13.5, 13.0, 14.0, 15.5, 15.0, 16.0, 15.0, 17.0,
        ]);
        let line = macd_at(&s, 2, 4, 3, MacdOutput::Line, 1).unwrap();
        let signal = macd_at(&s, 2, 4, 3, MacdOutput::Signal, 1).unwrap();
        let hist = macd_at(&s, 2, 4, 3, MacdOutput::Histogram, 1).unwrap();
        assert_eq!(hist.to_bits(), (line - signal).to_bits());
    }

    #[test]
    fn single_matches_full() {
        let s = Direct::from_chronological(vec![
            10.0, 11.0, 10.5, 12.0, 13.5, 13.0, 14.0, 15.5, 15.0, 16.0, 15.0, 17.0,
        ]);
        for output in [MacdOutput::Line, MacdOutput::Signal, MacdOutput::Histogram] {
            let full = macd_series(&s, 2, 4, 3, output).unwrap();
            for i in 0..full.len() {
                assert_eq!(
                    macd_at(&s, 2, 4, 3, output, i).unwrap().to_bits(),
                    full.value_at(i).unwrap().to_bits()
                );
            }
            assert!(macd_at(&s, 2, 4, 3, output, full.len()).is_err());
        }
    }
}
