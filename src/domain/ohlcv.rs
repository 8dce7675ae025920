//! OHLCV bar representation and sequence checks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::RuletraderError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// Bar with every price field set to `close`.
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        Bar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }
}

/// Check that a bar sequence is usable for a run: non-empty, strictly
/// increasing dates and positive finite closes.
pub fn validate_bars(bars: &[Bar]) -> Result<(), RuletraderError> {
    if bars.is_empty() {
        return Err(RuletraderError::InsufficientData { bars: 0, minimum: 1 });
    }

    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(RuletraderError::invalid_input(format!(
                "bar {} ({}) has non-positive or non-finite close {}",
                i, bar.date, bar.close
            )));
        }
    }

    if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(RuletraderError::invalid_input(format!(
            "bars out of order or duplicated: {} followed by {}",
            w[0].date, w[1].date
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn flat_bar_fields() {
        let bar = Bar::flat(day(15), 105.0);
        assert_eq!(bar.date, day(15));
        assert_eq!(bar.open, 105.0);
        assert_eq!(bar.high, 105.0);
        assert_eq!(bar.low, 105.0);
        assert_eq!(bar.volume, 0);
    }

    #[test]
    fn validate_accepts_ordered_positive_bars() {
        let bars = vec![Bar::flat(day(1), 10.0), Bar::flat(day(2), 11.0)];
        assert!(validate_bars(&bars).is_ok());
    }

    #[test]
    fn validate_rejects_empty() {
        let err = validate_bars(&[]).unwrap_err();
        assert!(matches!(
            err,
            RuletraderError::InsufficientData { bars: 0, minimum: 1 }
        ));
    }

    #[test]
    fn validate_rejects_duplicate_dates() {
        let bars = vec![Bar::flat(day(1), 10.0), Bar::flat(day(1), 11.0)];
        let err = validate_bars(&bars).unwrap_err();
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn validate_rejects_descending_dates() {
        let bars = vec![Bar::flat(day(3), 10.0), Bar::flat(day(2), 11.0)];
        assert!(validate_bars(&bars).is_err());
    }

    #[test]
    fn validate_rejects_bad_close() {
        assert!(validate_bars(&[Bar::flat(day(1), 0.0)]).is_err());
        assert!(validate_bars(&[Bar::flat(day(1), -3.0)]).is_err());
        assert!(validate_bars(&[Bar::flat(day(1), f64::NAN)]).is_err());
        assert!(validate_bars(&[Bar::flat(day(1), f64::INFINITY)]).is_err());
    }
}
