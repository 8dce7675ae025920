//! Parallel SMA-period sweep.
//!
//! Each period is an independent backtest with its own broker, engine and
//! tracker, so runs are fanned out across the rayon pool with no shared state.

use rayon::prelude::*;

use super::backtest::{run_backtest, BacktestConfig};
use super::error::RuletraderError;
use super::ohlcv::Bar;
use super::strategy::RuleSpec;
use super::trade_tracker::BacktestSummary;

#[derive(Debug)]
pub struct SweepResult {
    pub sma_period: usize,
    pub outcome: Result<BacktestSummary, RuletraderError>,
}

/// Run one backtest per entry of `periods`. Results come back in input order.
pub fn run_sweep(
    bars: &[Bar],
    rule: &RuleSpec,
    base: &BacktestConfig,
    periods: &[usize],
) -> Vec<SweepResult> {
    periods
        .par_iter()
        .map(|&sma_period| {
            let config = BacktestConfig {
                sma_period,
                ..base.clone()
            };
            SweepResult {
                sma_period,
                outcome: run_backtest(bars, rule, &config),
            }
        })
        .collect()
}

/// Parse a comma separated list of periods, e.g. `"5, 10,20"`.
pub fn parse_periods(input: &str) -> Result<Vec<usize>, RuletraderError> {
    let periods = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| RuletraderError::invalid_input(format!("invalid sma period '{}'", s)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if periods.is_empty() {
        return Err(RuletraderError::invalid_input("no sma periods given"));
    }
    Ok(periods)
}
