//! Backtest engine.
//!
//! Replays one asset from its oldest quote to its newest, driving a long-only
//! position through `Flat → Open → Closed → Flat`:
//!
//! - `Flat`: evaluate the entry filter; on true open at the strategy price
//! - `Open`: evaluate exit rules (never on the entry bar); on the first that
//!   fires, record a trade and return to `Flat`
//!
//! A position still open when the data runs out is reported as
//! [`BacktestResult::open_position`] and excluded from trades and metrics.
//! A [`RangeError`] at one index (usually indicator warmup) skips that
//! decision only and is counted in [`BacktestResult::skipped`].

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::error::{QuantscreenError, RangeError};
use crate::domain::metrics::Metrics;
use crate::domain::provider::{DataProvider, Precomputed, Snapshot};
use crate::domain::quote::Asset;
use crate::domain::strategy::Strategy;

/// A completed round trip. Indices are newest-first, so `entry_index > exit_index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub profit: f64,
}

impl Trade {
    pub fn holding_bars(&self) -> usize {
        self.entry_index - self.exit_index
    }

    /// `exit / entry`, or `None` when the entry price is not positive.
    pub fn price_ratio(&self) -> Option<f64> {
        (self.entry_price > 0.0).then(|| self.exit_price / self.entry_price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenPosition {
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
}

impl OpenPosition {
    fn close(self, snapshot: &Snapshot<'_>, exit_price: f64) -> Trade {
        Trade {
            entry_index: self.entry_index,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_index: snapshot.index(),
            exit_time: snapshot.quote().timestamp,
            exit_price,
            profit: exit_price - self.entry_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Flat,
    Open(OpenPosition),
    Closed(Trade),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub bars: usize,
    pub trades: Vec<Trade>,
    pub open_position: Option<OpenPosition>,
    pub skipped: usize,
    pub metrics: Metrics,
}

fn try_enter(strategy: &Strategy, snapshot: &Snapshot<'_>) -> Result<Option<OpenPosition>, RangeError> {
    if !strategy.entry.evaluate(snapshot)? {
        return Ok(None);
    }
    Ok(Some(OpenPosition {
        entry_index: snapshot.index(),
        entry_time: snapshot.quote().timestamp,
        entry_price: snapshot.value(&strategy.price)?,
    }))
}

fn try_exit(strategy: &Strategy, snapshot: &Snapshot<'_>) -> Result<Option<f64>, RangeError> {
    match strategy.triggered_exit(snapshot)? {
        Some(_) => Ok(Some(snapshot.value(&strategy.price)?)),
        None => Ok(None),
    }
}

/// One step while flat: open a position if the entry filter holds.
fn step_flat(strategy: &Strategy, snapshot: &Snapshot<'_>, skipped: &mut usize) -> State {
    let symbol = snapshot.provider().asset().symbol();
    let index = snapshot.index();
    match try_enter(strategy, snapshot) {
        Ok(Some(position)) => {
            debug!(symbol, index, price = position.entry_price, "open long");
            State::Open(position)
        }
        Ok(None) => State::Flat,
        Err(e) => {
            *skipped += 1;
            debug!(symbol, index, error = %e, "entry skipped");
            State::Flat
        }
    }
}

/// One step while open: close the position on the first exit rule that fires.
fn step_open(
    strategy: &Strategy,
    snapshot: &Snapshot<'_>,
    position: OpenPosition,
    skipped: &mut usize,
) -> State {
    let symbol = snapshot.provider().asset().symbol();
    let index = snapshot.index();
    match try_exit(strategy, snapshot) {
        Ok(Some(price)) => {
            let trade = position.close(snapshot, price);
            debug!(symbol, index, price, profit = trade.profit, "close long");
            State::Closed(trade)
        }
        Ok(None) => State::Open(position),
        Err(e) => {
            *skipped += 1;
            debug!(symbol, index, error = %e, "exit skipped");
            State::Open(position)
        }
    }
}

/// Run `strategy` over a single asset.
pub fn run_backtest(asset: &Asset, strategy: &Strategy) -> Result<BacktestResult, QuantscreenError> {
    let symbol = asset.symbol();
    let evaluation = |source| QuantscreenError::Evaluation {
        symbol: symbol.to_string(),
        source,
    };

    let provider = DataProvider::new(asset);
    let store = Precomputed::build(provider, strategy.methods()).map_err(evaluation)?;

    let mut state = State::Flat;
    let mut trades = Vec::new();
    let mut skipped = 0usize;

    for index in (0..provider.len()).rev() {
        let snapshot = provider
            .snapshot(index)
            .map_err(evaluation)?
            .with_precomputed(&store);

        state = match state {
            State::Flat => step_flat(strategy, &snapshot, &mut skipped),
            State::Open(position) => step_open(strategy, &snapshot, position, &mut skipped),
            // Re-entry is possible on the bar after an exit.
            State::Closed(trade) => {
                trades.push(trade);
                step_flat(strategy, &snapshot, &mut skipped)
            }
        };
    }

    let open_position = match state {
        State::Open(position) => Some(position),
        State::Closed(trade) => {
            trades.push(trade);
            None
        }
        State::Flat => None,
    };
    let metrics = Metrics::compute(&trades);

    info!(
        symbol,
        bars = provider.len(),
        trades = trades.len(),
        skipped,
        total_profit = metrics.total_profit,
        "backtest complete"
    );

    Ok(BacktestResult {
        symbol: symbol.to_string(),
        bars: provider.len(),
        trades,
        open_position,
        skipped,
        metrics,
    })
}

/// Independent backtests over many assets, run in parallel.
pub fn run_many(assets: &[Asset], strategy: &Strategy) -> Vec<Result<BacktestResult, QuantscreenError>> {
    assets
        .par_iter()
        .map(|asset| run_backtest(asset, strategy))
        .collect()
}
