//! Quote records and the per-symbol asset store.

use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Quote {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        true_range(self.high, self.low, prev_close)
    }
}

pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();
    hl.max(hc).max(lc)
}

/// A symbol and its quotes.
///
/// Quotes are stored oldest first but addressed newest first: index 0 is the
/// latest quote and higher indices walk back in time.
#[derive(Debug, Clone)]
pub struct Asset {
    symbol: String,
    quotes: Vec<Quote>,
}

impl Asset {
    /// Build an asset from quotes in any order; they are sorted by timestamp.
    pub fn new(symbol: impl Into<String>, mut quotes: Vec<Quote>) -> Self {
        quotes.sort_by_key(|q| q.timestamp);
        Self {
            symbol: symbol.into(),
            quotes,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Quote at a newest-first index.
    pub fn quote(&self, index: usize) -> Option<&Quote> {
        let len = self.quotes.len();
        if index < len {
            self.quotes.get(len - 1 - index)
        } else {
            None
        }
    }
}
