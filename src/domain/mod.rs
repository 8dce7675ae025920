//! Core domain types and logic.

pub mod ohlcv;
pub mod strategy;
pub mod condition;
pub mod condition_parser;
pub mod condition_eval;
pub mod indicator;
pub mod broker;
pub mod trade_tracker;
pub mod engine;
pub mod backtest;
pub mod metrics;
pub mod sweep;
pub mod config_validation;
pub mod error;
