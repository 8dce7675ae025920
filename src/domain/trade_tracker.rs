//! Closed-trade ledger, equity curve, and the run summary derived from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::broker::ClosedPosition;

/// Round to 2 decimal places for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Win,
    Loss,
}

impl TradeStatus {
    /// A trade wins only on strictly positive pnl. Break-even counts as a loss.
    pub fn classify(pnl: f64) -> Self {
        if pnl > 0.0 {
            TradeStatus::Win
        } else {
            TradeStatus::Loss
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Win => write!(f, "win"),
            TradeStatus::Loss => write!(f, "loss"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub size: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub status: TradeStatus,
}

impl Trade {
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub price: f64,
    pub sma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub total_return_pct: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub final_value: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub trade_history: Vec<Trade>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeTracker {
    initial_cash: f64,
    equity_curve: Vec<EquityPoint>,
    trades: Vec<Trade>,
}

impl TradeTracker {
    pub fn new(initial_cash: f64) -> Self {
        TradeTracker {
            initial_cash,
            equity_curve: Vec::new(),
            trades: Vec::new(),
        }
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Append the snapshot for one processed bar.
    pub fn record_bar(&mut self, point: EquityPoint) {
        self.equity_curve.push(point);
    }

    /// Log a LONG -> FLAT transition. Status is decided on the unrounded pnl.
    pub fn record_close(&mut self, closed: &ClosedPosition) -> &Trade {
        let trade = Trade {
            entry_date: closed.entry_date,
            exit_date: closed.exit_date,
            size: closed.size,
            entry_price: closed.entry_price,
            exit_price: closed.exit_price,
            pnl: round2(closed.pnl),
            pnl_pct: round2(closed.pnl_pct),
            status: TradeStatus::classify(closed.pnl),
        };
        self.trades.push(trade);
        &self.trades[self.trades.len() - 1]
    }

    pub fn summarize(&self, final_value: f64) -> BacktestSummary {
        build_summary(
            self.initial_cash,
            final_value,
            self.equity_curve.clone(),
            self.trades.clone(),
        )
    }

    /// Consume the tracker, moving the recorded sequences into the summary.
    pub fn into_summary(self, final_value: f64) -> BacktestSummary {
        let TradeTracker {
            initial_cash,
            equity_curve,
            trades,
        } = self;
        build_summary(initial_cash, final_value, equity_curve, trades)
    }
}

fn build_summary(
    initial_cash: f64,
    final_value: f64,
    equity_curve: Vec<EquityPoint>,
    trade_history: Vec<Trade>,
) -> BacktestSummary {
    let total_trades = trade_history.len();
    let winning_trades = trade_history
        .iter()
        .filter(|t| t.status == TradeStatus::Win)
        .count();
    let losing_trades = total_trades - winning_trades;

    let win_rate = if total_trades > 0 {
        winning_trades as f64 / total_trades as f64 * 100.0
    } else {
        0.0
    };

    let total_return_pct = if initial_cash > 0.0 {
        (final_value - initial_cash) / initial_cash * 100.0
    } else {
        0.0
    };

    BacktestSummary {
        total_return_pct: round2(total_return_pct),
        win_rate: round2(win_rate),
        total_trades,
        winning_trades,
        losing_trades,
        final_value,
        equity_curve,
        trade_history,
    }
}
