//! Backtest runner: validates inputs, drives the engine over every bar, and
//! returns the summary.
//!
//! A run is a deterministic fold over an ordered bar sequence. Nothing here
//! blocks or reads a clock, so identical inputs always give identical output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::broker::{Broker, PositionSizing};
use super::engine::StrategyEngine;
use super::error::RuletraderError;
use super::ohlcv::{validate_bars, Bar};
use super::strategy::RuleSpec;
use super::trade_tracker::BacktestSummary;

pub const DEFAULT_INITIAL_CASH: f64 = 10_000.0;
pub const DEFAULT_COMMISSION: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    pub commission_rate: f64,
    pub sma_period: usize,
    pub sizing: PositionSizing,
}

impl BacktestConfig {
    pub fn new(sma_period: usize) -> Self {
        BacktestConfig {
            initial_cash: DEFAULT_INITIAL_CASH,
            commission_rate: DEFAULT_COMMISSION,
            sma_period,
            sizing: PositionSizing::AllIn,
        }
    }

    pub fn validate(&self) -> Result<(), RuletraderError> {
        if self.sma_period < 1 {
            return Err(RuletraderError::invalid_input("sma_period must be at least 1"));
        }
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(RuletraderError::invalid_input(format!(
                "initial_cash must be positive, got {}",
                self.initial_cash
            )));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(RuletraderError::invalid_input(format!(
                "commission_rate must be in [0, 1), got {}",
                self.commission_rate
            )));
        }
        match self.sizing {
            PositionSizing::Units(0) => Err(RuletraderError::invalid_input(
                "fixed unit sizing needs at least 1 unit",
            )),
            PositionSizing::CashFraction(f) if !(f > 0.0 && f <= 1.0) => {
                Err(RuletraderError::invalid_input(format!(
                    "cash fraction must be in (0, 1], got {}",
                    f
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Everything that identifies one run, echoed back in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rule: RuleSpec,
    pub config: BacktestConfig,
}

/// Run one backtest over `bars` in order.
///
/// Fails fast, before any simulation, on an empty or unordered bar sequence
/// or an invalid config.
pub fn run_backtest(
    bars: &[Bar],
    rule: &RuleSpec,
    config: &BacktestConfig,
) -> Result<BacktestSummary, RuletraderError> {
    config.validate()?;
    validate_bars(bars)?;

    info!(
        bars = bars.len(),
        sma_period = config.sma_period,
        rule = %rule,
        "starting backtest"
    );

    let broker = Broker::new(config.initial_cash, config.commission_rate, config.sizing);
    let mut engine = StrategyEngine::new(rule.clone(), config.sma_period, broker);

    for bar in bars {
        engine.step(bar);
    }

    let summary = engine.finish();

    info!(
        final_value = summary.final_value,
        total_return_pct = summary.total_return_pct,
        trades = summary.total_trades,
        "backtest complete"
    );

    Ok(summary)
}
