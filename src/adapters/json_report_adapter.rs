//! JSON report adapter implementing ReportPort.
//!
//! Writes the request, the summary (including the full equity curve and trade
//! history) and the derived metrics as one pretty-printed document.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::domain::backtest::BacktestRequest;
use crate::domain::error::RuletraderError;
use crate::domain::metrics::Metrics;
use crate::domain::trade_tracker::BacktestSummary;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
pub struct BacktestReport<'a> {
    pub request: &'a BacktestRequest,
    pub summary: &'a BacktestSummary,
    pub metrics: &'a Metrics,
}

impl BacktestReport<'_> {
    pub fn to_json(&self) -> Result<String, RuletraderError> {
        serde_json::to_string_pretty(self).map_err(|e| RuletraderError::Report {
            reason: format!("failed to serialize report: {}", e),
        })
    }
}

#[derive(Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(
        &self,
        request: &BacktestRequest,
        summary: &BacktestSummary,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), RuletraderError> {
        let json = BacktestReport {
            request,
            summary,
            metrics,
        }
        .to_json()?;

        if let Some(parent) = Path::new(output_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| RuletraderError::Report {
                    reason: format!("failed to create {}: {}", parent.display(), e),
                })?;
            }
        }

        fs::write(output_path, json).map_err(|e| RuletraderError::Report {
            reason: format!("failed to write {}: {}", output_path, e),
        })?;

        info!(path = output_path, "report written");
        Ok(())
    }
}
