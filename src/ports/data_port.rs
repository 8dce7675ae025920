//! Market data port trait.
//!
//! Implementations return the bars for one ticker within an inclusive date
//! range, sorted by date.

use crate::domain::error::RuletraderError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

pub trait DataPort {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, RuletraderError>;

    fn list_tickers(&self) -> Result<Vec<String>, RuletraderError>;
}
