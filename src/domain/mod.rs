//! Core domain types and the breakout decision rules.

pub mod ohlcv;
pub mod volatility;
pub mod lookback;
pub mod breakout;
pub mod trailing_stop;
pub mod position;
pub mod strategy;
pub mod backtest;
pub mod config_validation;
pub mod error;
