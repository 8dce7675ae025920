#![allow(dead_code)]

use chrono::NaiveDate;
use ruletrader::domain::backtest::BacktestRequest;
use ruletrader::domain::error::RuletraderError;
use ruletrader::domain::metrics::Metrics;
pub use ruletrader::domain::ohlcv::Bar;
use ruletrader::domain::trade_tracker::BacktestSummary;
use ruletrader::ports::data_port::DataPort;
use ruletrader::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, RuletraderError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(RuletraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_tickers(&self) -> Result<Vec<String>, RuletraderError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

/// Records every report instead of writing it.
#[derive(Default)]
pub struct MockReportPort {
    pub written: RefCell<Vec<(String, BacktestSummary, Metrics)>>,
}

impl ReportPort for MockReportPort {
    fn write(
        &self,
        _request: &BacktestRequest,
        summary: &BacktestSummary,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), RuletraderError> {
        self.written.borrow_mut().push((
            output_path.to_string(),
            summary.clone(),
            metrics.clone(),
        ));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One bar per calendar day starting 2024-01-01.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar::flat(start + chrono::Duration::days(i as i64), close))
        .collect()
}

pub fn csv_from_closes(closes: &[f64]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for bar in bars_from_closes(closes) {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        ));
    }
    out
}
