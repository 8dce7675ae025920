//! Extended performance statistics derived from a finished run.

use serde::{Deserialize, Serialize};

use super::trade_tracker::{BacktestSummary, EquityPoint, Trade};

const BARS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Largest peak-to-trough decline of the equity curve, as a fraction.
    pub max_drawdown: f64,
    /// Longest run of bars spent below a previous peak.
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: f64,
    /// Infinite when there are wins but no losses; serialized as `"inf"`.
    #[serde(with = "unbounded_ratio")]
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_days: f64,
}

impl Metrics {
    pub fn compute(summary: &BacktestSummary) -> Self {
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&summary.equity_curve);
        let sharpe_ratio = compute_sharpe(&summary.equity_curve);
        let trades = &summary.trade_history;

        let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|&p| p > 0.0).collect();
        let losses: Vec<f64> = trades.iter().map(|t| -t.pnl).filter(|&p| p > 0.0).collect();

        let total_wins: f64 = wins.iter().sum();
        let total_losses: f64 = losses.iter().sum();

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Metrics {
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio,
            profit_factor,
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::max),
            avg_holding_days: avg_holding_days(trades),
        }
    }
}

/// JSON has no infinity, so `+inf` is written as the string `"inf"`.
mod unbounded_ratio {
    use serde::{de, Deserialize, Deserializer, Serializer};

    const INF: &str = "inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str(INF)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) if s == INF => Ok(f64::INFINITY),
            Repr::Text(s) => Err(de::Error::custom(format!(
                "expected a number or \"{}\", got \"{}\"",
                INF, s
            ))),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn avg_holding_days(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let total: i64 = trades.iter().map(Trade::holding_days).sum();
    total as f64 / trades.len() as f64
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.value;
    let mut max_dd = 0.0_f64;
    let mut duration = 0usize;
    let mut max_duration = 0usize;

    for point in equity_curve {
        if point.value >= peak {
            peak = point.value;
            duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.value) / peak);
            duration += 1;
            max_duration = max_duration.max(duration);
        }
    }

    (max_dd, max_duration)
}

/// Annualised Sharpe ratio of bar-to-bar returns, zero risk-free rate.
fn compute_sharpe(equity_curve: &[EquityPoint]) -> f64 {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            if w[0].value > 0.0 {
                (w[1].value - w[0].value) / w[0].value
            } else {
                0.0
            }
        })
        .collect();

    if returns.is_empty() {
        return 0.0;
    }

    let avg = mean(&returns);
    let variance = returns.iter().map(|r| (r - avg).powi(2)).sum::<f64>() / returns.len() as f64;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        avg / stddev * BARS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}
