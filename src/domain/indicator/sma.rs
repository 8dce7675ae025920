//! Simple Moving Average over a rolling window of closes.
//!
//! SMA(n) = (P[i-n+1] + ... + P[i]) / n
//! Warmup: no value until n closes have been pushed.
//!
//! The window sum is recomputed from the buffered closes on every push rather
//! than carried as a running total, so no rounding residue from closes that
//! have left the window carries forward.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct SmaWindow {
    period: usize,
    closes: VecDeque<f64>,
}

impl SmaWindow {
    /// `period` must be at least 1.
    pub fn new(period: usize) -> Self {
        SmaWindow {
            period,
            closes: VecDeque::with_capacity(period.max(1)),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn is_warm(&self) -> bool {
        self.period > 0 && self.closes.len() == self.period
    }

    /// Push the next close. Returns the average once the window is full.
    pub fn push(&mut self, close: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        if self.closes.len() == self.period {
            self.closes.pop_front();
        }
        self.closes.push_back(close);
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if !self.is_warm() {
            return None;
        }
        Some(self.closes.iter().sum::<f64>() / self.period as f64)
    }
}
