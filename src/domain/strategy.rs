//! Strategy configuration: an entry filter, a price method and exit rules.

use std::collections::HashSet;
use std::fmt;

use crate::domain::error::RangeError;
use crate::domain::filter::Filter;
use crate::domain::method::{Method, Scalar};
use crate::domain::provider::{PriceField, Snapshot};

/// Exit condition for an open long position.
///
/// Parameters are fixed at construction; `should_exit` only reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExitRule {
    /// Exit once `price >= target`.
    TakeProfit { target: Scalar, price: Method },
    /// Exit once `price <= target`.
    StopLoss { target: Scalar, price: Method },
    /// Exit while the filter holds.
    Signal(Filter),
}

impl ExitRule {
    pub fn take_profit(target: f64) -> Self {
        ExitRule::TakeProfit {
            target: Scalar(target),
            price: Method::Field(PriceField::Close),
        }
    }

    pub fn stop_loss(target: f64) -> Self {
        ExitRule::StopLoss {
            target: Scalar(target),
            price: Method::Field(PriceField::Close),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ExitRule::TakeProfit { .. } => "take_profit",
            ExitRule::StopLoss { .. } => "stop_loss",
            ExitRule::Signal(_) => "signal",
        }
    }

    pub fn should_exit(&self, snapshot: &Snapshot<'_>) -> Result<bool, RangeError> {
        match self {
            ExitRule::TakeProfit { target, price } => Ok(snapshot.value(price)? >= target.get()),
            ExitRule::StopLoss { target, price } => Ok(snapshot.value(price)? <= target.get()),
            ExitRule::Signal(filter) => filter.evaluate(snapshot),
        }
    }

    fn collect_methods<'s>(&'s self, out: &mut Vec<&'s Method>) {
        match self {
            ExitRule::TakeProfit { price, .. } | ExitRule::StopLoss { price, .. } => out.push(price),
            ExitRule::Signal(filter) => out.extend(filter.methods()),
        }
    }
}

impl fmt::Display for ExitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitRule::TakeProfit { target, price } => write!(f, "take_profit({} >= {})", price, target),
            ExitRule::StopLoss { target, price } => write!(f, "stop_loss({} <= {})", price, target),
            ExitRule::Signal(filter) => write!(f, "signal({})", filter),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Strategy {
    pub name: String,
    pub description: String,
    pub entry: Filter,
    /// Price recorded on entry and on exit.
    pub price: Method,
    pub exits: Vec<ExitRule>,
}

impl Strategy {
    /// Distinct top-level methods read by this strategy, first occurrence first.
    pub fn methods(&self) -> Vec<&Method> {
        let mut all = self.entry.methods();
        all.push(&self.price);
        for exit in &self.exits {
            exit.collect_methods(&mut all);
        }

        let mut seen = HashSet::new();
        all.retain(|m| seen.insert(*m));
        all
    }

    /// First exit rule that fires at `snapshot`, if any.
    ///
    /// A rule that cannot be evaluated at this index does not hide the others.
    /// Its error is returned only when no rule fires.
    pub fn triggered_exit(&self, snapshot: &Snapshot<'_>) -> Result<Option<&ExitRule>, RangeError> {
        let mut first_error = None;
        for exit in &self.exits {
            match exit.should_exit(snapshot) {
                Ok(true) => return Ok(Some(exit)),
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::CompareOp;
    use crate::domain::provider::DataProvider;
    use crate::domain::quote::{Asset, Quote};
    use chrono::{Duration, NaiveDate};

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

    fn sample_strategy() -> Strategy {
        Strategy {
            name: "Breakout".into(),
            description: "Close above 100 with ATR guard".into(),
            entry: Filter::And(vec![
                Filter::compare(CompareOp::Gt, close(), Method::value(100.0)),
                Filter::compare(CompareOp::Lt, Method::Atr { period: 3 }, Method::value(5.0)),
            ]),
            price: close(),
            exits: vec![
                ExitRule::take_profit(120.0),
                ExitRule::stop_loss(95.0),
                ExitRule::Signal(Filter::compare(
                    CompareOp::Gt,
                    Method::Atr { period: 3 },
                    Method::value(10.0),
                )),
            ],
        }
    }

    #[test]
    fn take_profit_is_inclusive() {
        let a = asset(&[14.0, 15.0]);
        let provider = DataProvider::new(&a);
        let tp = ExitRule::take_profit(15.0);
        assert_eq!(tp.should_exit(&provider.snapshot(0).unwrap()), Ok(true));
        assert_eq!(tp.should_exit(&provider.snapshot(1).unwrap()), Ok(false));
    }

    #[test]
    fn stop_loss_is_inclusive() {
        let a = asset(&[96.0, 95.0]);
        let provider = DataProvider::new(&a);
        let sl = ExitRule::stop_loss(95.0);
        assert_eq!(sl.should_exit(&provider.snapshot(0).unwrap()), Ok(true));
        assert_eq!(sl.should_exit(&provider.snapshot(1).unwrap()), Ok(false));
    }

    #[test]
    fn take_profit_reads_configured_price() {
        let a = asset(&[10.0]);
        let snap = DataProvider::new(&a).snapshot(0).unwrap();
        let on_high = ExitRule::TakeProfit {
            target: Scalar(11.0),
            price: Method::Field(PriceField::High),
        };
        assert_eq!(on_high.should_exit(&snap), Ok(true));
        assert_eq!(ExitRule::take_profit(11.0).should_exit(&snap), Ok(false));
    }

    #[test]
    fn methods_are_deduplicated_in_order() {
        let s = sample_strategy();
        let methods = s.methods();
        assert_eq!(
            methods,
            vec![
                &close(),
                &Method::value(100.0),
                &Method::Atr { period: 3 },
                &Method::value(5.0),
                &Method::value(10.0),
            ]
        );
    }

    #[test]
    fn triggered_exit_returns_first_match() {
        let a = asset(&[130.0]);
        let snap = DataProvider::new(&a).snapshot(0).unwrap();
        let s = sample_strategy();
        let exit = s.triggered_exit(&snap);
        // ATR(3) is undefined on a single bar, but take-profit fires first.
        assert_eq!(exit.unwrap().map(ExitRule::tag), Some("take_profit"));
    }

    #[test]
    fn triggered_exit_looks_past_unevaluable_rules() {
        let a = asset(&[130.0]);
        let snap = DataProvider::new(&a).snapshot(0).unwrap();
        let mut s = sample_strategy();
        s.exits.rotate_right(1);
        // ATR(3) signal first, undefined here; take-profit still fires.
        assert_eq!(s.exits[0].tag(), "signal");
        let exit = s.triggered_exit(&snap);
        assert_eq!(exit.unwrap().map(ExitRule::tag), Some("take_profit"));
    }

    #[test]
    fn triggered_exit_propagates_range_error() {
        let a = asset(&[100.0]);
        let snap = DataProvider::new(&a).snapshot(0).unwrap();
        assert!(sample_strategy().triggered_exit(&snap).is_err());
    }

    #[test]
    fn exit_rules_display() {
        assert_eq!(ExitRule::take_profit(15.0).to_string(), "take_profit(close >= 15)");
        assert_eq!(ExitRule::stop_loss(9.5).to_string(), "stop_loss(close <= 9.5)");
    }

    #[test]
    fn strategies_compare_structurally() {
        assert_eq!(sample_strategy(), sample_strategy());
        let mut other = sample_strategy();
        other.exits.pop();
        assert_ne!(sample_strategy(), other);
    }
}
