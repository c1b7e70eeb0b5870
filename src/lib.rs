//! Adaptive-lookback breakout strategy with a trailing stop.
//!
//! Hexagonal architecture: the decision rule lives in [`domain`], the
//! strategy's collaborators (history, orders, telemetry, config) are port
//! traits in [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
