//! Numeric expression nodes.
//!
//! A [`Method`] evaluates against a [`DataProvider`] either as a full series
//! ([`Method::evaluate`]) or at a single index ([`Method::value_at`]). The two
//! entry points share their arithmetic and agree bit-for-bit.
//!
//! Equality is structural: two methods are equal when they have the same kind
//! and recursively equal parameters. Floating parameters compare by bit
//! pattern through [`Scalar`], which also makes methods hashable so compiled
//! trees can be deduplicated.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::domain::error::RangeError;
use crate::domain::indicator::atr::{atr_at, atr_series};
use crate::domain::indicator::bollinger::{bollinger_at, bollinger_series, BollingerOutput};
use crate::domain::indicator::ema::{ema_at, ema_series};
use crate::domain::indicator::macd::{macd_at, macd_series, MacdOutput};
use crate::domain::indicator::sma::{sma_at, sma_series};
use crate::domain::indicator::stochastic::{stochastic_at, stochastic_series, StochasticOutput};
use crate::domain::indicator::windowed_len;
use crate::domain::provider::{DataProvider, PriceField};
use crate::domain::series::{AnySeries, Repeat, Series, SubRange};

/// An `f64` parameter with bitwise equality and hashing.
#[derive(Debug, Clone, Copy)]
pub struct Scalar(pub f64);

impl Scalar {
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Value(Scalar),
    Field(PriceField),
    AbsDiff(Box<Method>, Box<Method>),
    Atr {
        period: usize,
    },
    Sma {
        period: usize,
        source: Box<Method>,
    },
    Ema {
        period: usize,
        source: Box<Method>,
    },
    Bollinger {
        period: usize,
        multiplier: Scalar,
        output: BollingerOutput,
    },
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
        output: MacdOutput,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
        output: StochasticOutput,
    },
}

impl Method {
    pub fn value(value: f64) -> Self {
        Method::Value(Scalar(value))
    }

    pub fn abs_diff(lhs: Method, rhs: Method) -> Self {
        Method::AbsDiff(Box::new(lhs), Box::new(rhs))
    }

    /// Number of indices this method is defined on for an asset of `quotes`
    /// quotes. The difference is the lookback the method consumes.
    pub fn len_for(&self, quotes: usize) -> usize {
        match self {
            Method::Value(_) | Method::Field(_) => quotes,
            Method::AbsDiff(lhs, rhs) => lhs.len_for(quotes).min(rhs.len_for(quotes)),
            Method::Atr { period } => windowed_len(quotes.saturating_sub(1), *period),
            Method::Sma { period, source } | Method::Ema { period, source } => {
                windowed_len(source.len_for(quotes), *period)
            }
            Method::Bollinger { period, .. } => windowed_len(quotes, *period),
            Method::Macd {
                fast,
                slow,
                signal,
                output,
            } => {
                let line = windowed_len(quotes, *fast).min(windowed_len(quotes, *slow));
                match output {
                    MacdOutput::Line => line,
                    MacdOutput::Signal | MacdOutput::Histogram => windowed_len(line, *signal),
                }
            }
            Method::Stochastic {
                k_period,
                d_period,
                output,
            } => {
                let k = windowed_len(quotes, *k_period);
                match output {
                    StochasticOutput::K => k,
                    StochasticOutput::D => windowed_len(k, *d_period),
                }
            }
        }
    }

    /// Full derived series.
    pub fn evaluate<'a>(&self, provider: DataProvider<'a>) -> Result<AnySeries<'a>, RangeError> {
        let close = provider.close();
        Ok(match self {
            Method::Value(v) => AnySeries::new(Repeat::new(v.get(), provider.len())),
            Method::Field(field) => AnySeries::new(provider.field(*field)),
            Method::AbsDiff(lhs, rhs) => {
                let lhs = lhs.evaluate(provider)?;
                let rhs = rhs.evaluate(provider)?;
                let len = lhs.len().min(rhs.len());
                AnySeries::new(AbsDiff::new(
                    SubRange::truncate(lhs, len),
                    SubRange::truncate(rhs, len),
                ))
            }
            Method::Atr { period } => AnySeries::new(atr_series(provider, *period)?),
            Method::Sma { period, source } => {
                AnySeries::new(sma_series(&source.evaluate(provider)?, *period)?)
            }
            Method::Ema { period, source } => {
                AnySeries::new(ema_series(&source.evaluate(provider)?, *period)?)
            }
            Method::Bollinger {
                period,
                multiplier,
                output,
            } => AnySeries::new(bollinger_series(&close, *period, multiplier.get(), *output)?),
            Method::Macd {
                fast,
                slow,
                signal,
                output,
            } => AnySeries::new(macd_series(&close, *fast, *slow, *signal, *output)?),
            Method::Stochastic {
                k_period,
                d_period,
                output,
            } => AnySeries::new(stochastic_series(provider, *k_period, *d_period, *output)?),
        })
    }

    /// Value at one index, without building the full series where the
    /// indicator allows it.
    pub fn value_at(&self, provider: DataProvider<'_>, index: usize) -> Result<f64, RangeError> {
        RangeError::check(index, self.len_for(provider.len()))?;
        let close = provider.close();
        match self {
            Method::Value(v) => Ok(v.get()),
            Method::Field(field) => provider.field(*field).value_at(index),
            Method::AbsDiff(lhs, rhs) => {
                Ok((lhs.value_at(provider, index)? - rhs.value_at(provider, index)?).abs())
            }
            Method::Atr { period } => atr_at(provider, *period, index),
            Method::Sma { period, source } => {
                sma_at(&MethodView::new(source, provider), *period, index)
            }
            Method::Ema { period, source } => {
                ema_at(&source.evaluate(provider)?, *period, index)
            }
            Method::Bollinger {
                period,
                multiplier,
                output,
            } => bollinger_at(&close, *period, multiplier.get(), *output, index),
            Method::Macd {
                fast,
                slow,
                signal,
                output,
            } => macd_at(&close, *fast, *slow, *signal, *output, index),
            Method::Stochastic {
                k_period,
                d_period,
                output,
            } => stochastic_at(provider, *k_period, *d_period, *output, index),
        }
    }

    /// Every index of the asset, newest first; `None` where the method's
    /// lookback leaves it undefined.
    pub fn per_index_values(&self, provider: DataProvider<'_>) -> Result<Vec<Option<f64>>, RangeError> {
        let series = self.evaluate(provider)?;
        (0..provider.len())
            .map(|i| {
                if i < series.len() {
                    series.value_at(i).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Value(v) => write!(f, "{}", v),
            Method::Field(field) => write!(f, "{}", field),
            Method::AbsDiff(lhs, rhs) => write!(f, "abs_diff({}, {})", lhs, rhs),
            Method::Atr { period } => write!(f, "ATR({})", period),
            Method::Sma { period, source } => write!(f, "SMA({}, {})", period, source),
            Method::Ema { period, source } => write!(f, "EMA({}, {})", period, source),
            Method::Bollinger {
                period,
                multiplier,
                output,
            } => write!(f, "BOLLINGER_{}({},{})", output, period, multiplier),
            Method::Macd {
                fast,
                slow,
                signal,
                output,
            } => write!(f, "MACD_{}({},{},{})", output, fast, slow, signal),
            Method::Stochastic {
                k_period,
                d_period,
                output,
            } => write!(f, "STOCHASTIC_{}({},{})", output, k_period, d_period),
        }
    }
}

/// `|a[i] - b[i]|` over two series of equal length.
#[derive(Debug)]
pub struct AbsDiff<A, B> {
    lhs: A,
    rhs: B,
}

impl<A, B> AbsDiff<A, B>
where
    A: Series<Value = f64>,
    B: Series<Value = f64>,
{
    /// # Panics
    /// If the operands differ in length.
    pub fn new(lhs: A, rhs: B) -> Self {
        assert_eq!(
            lhs.len(),
            rhs.len(),
            "invariant violated: abs_diff operands differ in length"
        );
        Self { lhs, rhs }
    }
}

impl<A, B> Series for AbsDiff<A, B>
where
    A: Series<Value = f64>,
    B: Series<Value = f64>,
{
    type Value = f64;

    fn len(&self) -> usize {
        self.lhs.len()
    }

    fn value_at(&self, index: usize) -> Result<f64, RangeError> {
        Ok((self.lhs.value_at(index)? - self.rhs.value_at(index)?).abs())
    }
}

/// A method read lazily through its single-index entry point.
struct MethodView<'m, 'a> {
    method: &'m Method,
    provider: DataProvider<'a>,
}

impl<'m, 'a> MethodView<'m, 'a> {
    fn new(method: &'m Method, provider: DataProvider<'a>) -> Self {
        Self { method, provider }
    }
}

impl Series for MethodView<'_, '_> {
    type Value = f64;

    fn len(&self) -> usize {
        self.method.len_for(self.provider.len())
    }

    fn value_at(&self, index: usize) -> Result<f64, RangeError> {
        self.method.value_at(self.provider, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::{Asset, Quote};
    use chrono::{Duration, NaiveDate};
    use std::collections::HashSet;

    fn asset(closes: &[f64]) -> Asset {
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
        Asset::new("TEST", quotes)
    }

    fn close() -> Method {
        Method::Field(PriceField::Close)
    }

    #[test]
    fn abs_diff_scenario() {
        let a = asset(&[10.0, 11.0, 9.0, 12.0, 15.0]);
        let provider = DataProvider::new(&a);
        let m = Method::abs_diff(close(), Method::value(10.0));
        let oldest = provider.len() - 1;
        assert_eq!(m.value_at(provider, oldest), Ok(0.0));
        assert_eq!(m.value_at(provider, 0), Ok(5.0));

        let series = m.evaluate(provider).unwrap();
        assert_eq!(series.to_vec().unwrap(), vec![5.0, 2.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn abs_diff_aligns_mixed_lookbacks() {
        let a = asset(&[10.0, 11.0, 9.0, 12.0, 15.0, 14.0]);
        let provider = DataProvider::new(&a);
        let m = Method::abs_diff(close(), Method::Atr { period: 2 });
        let series = m.evaluate(provider).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(m.len_for(6), 4);
        for i in 0..4 {
            assert_eq!(series.value_at(i), m.value_at(provider, i));
        }
        assert_eq!(m.value_at(provider, 4), Err(RangeError::new(4, 4)));
    }

    #[test]
    #[should_panic(expected = "invariant violated")]
    fn abs_diff_rejects_unaligned_operands() {
        let a = crate::domain::series::Repeat::new(1.0, 3);
        let b = crate::domain::series::Repeat::new(1.0, 2);
        AbsDiff::new(a, b);
    }

    #[test]
    fn value_spans_asset() {
        let a = asset(&[1.0, 2.0]);
        let provider = DataProvider::new(&a);
        let m = Method::value(7.0);
        assert_eq!(m.evaluate(provider).unwrap().len(), 2);
        assert_eq!(m.value_at(provider, 1), Ok(7.0));
        assert_eq!(m.value_at(provider, 2), Err(RangeError::new(2, 2)));
    }

    #[test]
    fn structural_equality() {
        let a = Method::abs_diff(close(), Method::Atr { period: 14 });
        let b = Method::abs_diff(close(), Method::Atr { period: 14 });
        let c = Method::abs_diff(close(), Method::Atr { period: 15 });
        let d = Method::abs_diff(Method::Field(PriceField::Open), Method::Atr { period: 14 });
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);

        let set: HashSet<Method> = [a, b, c, d].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn scalar_equality_is_bitwise() {
        assert_eq!(Method::value(1.5), Method::value(1.5));
        assert_ne!(Method::value(0.0), Method::value(-0.0));
        assert_eq!(Method::value(f64::NAN), Method::value(f64::NAN));
    }

    #[test]
    fn len_for_matches_evaluated_length() {
        let a = asset(&(0..40).map(|i| 100.0 + (i % 7) as f64).collect::<Vec<_>>());
        let provider = DataProvider::new(&a);
        let methods = vec![
            close(),
            Method::value(1.0),
            Method::Atr { period: 14 },
            Method::Sma {
                period: 5,
                source: Box::new(Method::Atr { period: 3 }),
            },
            Method::Ema {
                period: 4,
                source: Box::new(close()),
            },
            Method::Bollinger {
                period: 20,
                multiplier: Scalar(2.0),
                output: BollingerOutput::Lower,
            },
            Method::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
                output: MacdOutput::Histogram,
            },
            Method::Stochastic {
                k_period: 14,
                d_period: 3,
                output: StochasticOutput::D,
            },
        ];
        for m in methods {
            assert_eq!(m.evaluate(provider).unwrap().len(), m.len_for(40), "{}", m);
        }
    }

    #[test]
    fn per_index_values_marks_warmup() {
        let a = asset(&[10.0, 11.0, 12.0, 13.0]);
        let provider = DataProvider::new(&a);
        let sma = Method::Sma {
            period: 3,
            source: Box::new(close()),
        };
        let values = sma.per_index_values(provider).unwrap();
        assert_eq!(values, vec![Some(12.0), Some(11.0), None, None]);
    }

    #[test]
    fn display_names() {
        assert_eq!(Method::Atr { period: 14 }.to_string(), "ATR(14)");
        assert_eq!(
            Method::abs_diff(close(), Method::value(10.0)).to_string(),
            "abs_diff(close, 10)"
        );
        assert_eq!(
            Method::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
                output: MacdOutput::Signal
            }
            .to_string(),
            "MACD_signal(12,26,9)"
        );
    }
}
