//! Performance metrics over a completed trade list.

use serde::Serialize;

use crate::domain::backtest::Trade;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub total_profit: f64,
    /// `Π(exit / entry) - 1` over trades with a positive entry price.
    pub compounded_return: f64,
    pub avg_win: f64,
    /// Positive magnitude.
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Positive magnitude.
    pub largest_loss: f64,
    pub profit_factor: f64,
    pub avg_holding_bars: f64,
    /// Largest peak-to-trough fall of the cumulative profit curve.
    pub max_drawdown: f64,
}

impl Metrics {
    pub fn compute(trades: &[Trade]) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut growth = 1.0_f64;
        let mut total_holding = 0usize;

        for trade in trades {
            let profit = trade.profit;
            if profit > 0.0 {
                trades_won += 1;
                total_wins += profit;
                if profit > largest_win {
                    largest_win = profit;
                }
            } else if profit < 0.0 {
                trades_lost += 1;
                total_losses += profit.abs();
                if profit.abs() > largest_loss {
                    largest_loss = profit.abs();
                }
            } else {
                trades_breakeven += 1;
            }

            if let Some(ratio) = trade.price_ratio() {
                growth *= ratio;
            }
            total_holding += trade.holding_bars();
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        let avg_holding_bars = if total_trades > 0 {
            total_holding as f64 / total_trades as f64
        } else {
            0.0
        };

        Metrics {
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            total_profit: trades.iter().map(|t| t.profit).sum(),
            compounded_return: growth - 1.0,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            profit_factor,
            avg_holding_bars,
            max_drawdown: compute_drawdown(trades),
        }
    }
}

fn compute_drawdown(trades: &[Trade]) -> f64 {
    let mut cumulative = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;

    for trade in trades {
        cumulative += trade.profit;
        if cumulative > peak {
            peak = cumulative;
        }
        let dd = peak - cumulative;
        if dd > max_dd {
            max_dd = dd;
        }
    }

    max_dd
}
