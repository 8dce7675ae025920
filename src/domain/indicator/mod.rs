//! Technical indicators computed incrementally, one close at a time.

pub mod sma;

pub use sma::SmaWindow;
