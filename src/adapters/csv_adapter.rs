//! CSV file data adapter.
//!
//! One file per ticker, `<TICKER>.csv`, with a header row and the columns
//! `date,open,high,low,close,volume`.

use crate::domain::error::RuletraderError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

fn data_error(reason: impl Into<String>) -> RuletraderError {
    RuletraderError::Data {
        reason: reason.into(),
    }
}

fn column<'a>(
    record: &'a StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<&'a str, RuletraderError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| data_error(format!("line {}: missing {} column", line, name)))
}

fn number<T: std::str::FromStr>(
    record: &StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<T, RuletraderError>
where
    T::Err: std::fmt::Display,
{
    column(record, index, name, line)?
        .parse()
        .map_err(|e| data_error(format!("line {}: invalid {} value: {}", line, name, e)))
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    fn parse_record(record: &StringRecord, line: u64) -> Result<Bar, RuletraderError> {
        let date_str = column(record, 0, "date", line)?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| data_error(format!("line {}: invalid date '{}': {}", line, date_str, e)))?;

        Ok(Bar {
            date,
            open: number(record, 1, "open", line)?,
            high: number(record, 2, "high", line)?,
            low: number(record, 3, "low", line)?,
            close: number(record, 4, "close", line)?,
            volume: number(record, 5, "volume", line)?,
        })
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, RuletraderError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
            let line = record.position().map_or(0, |p| p.line());
            let bar = Self::parse_record(&record, line)?;

            if bar.date < start_date || bar.date > end_date {
                continue;
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.date);
        debug!(ticker, path = %path.display(), bars = bars.len(), "loaded bars");
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, RuletraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            if let Some(ticker) = name.to_string_lossy().strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}
