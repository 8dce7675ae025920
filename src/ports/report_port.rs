//! Report output port trait.

use crate::domain::backtest::BacktestRequest;
use crate::domain::error::RuletraderError;
use crate::domain::metrics::Metrics;
use crate::domain::trade_tracker::BacktestSummary;

/// Port for writing a finished backtest somewhere durable.
pub trait ReportPort {
    fn write(
        &self,
        request: &BacktestRequest,
        summary: &BacktestSummary,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), RuletraderError>;
}
