//! Port traits for the strategy's external collaborators.

pub mod config_port;
pub mod history_port;
pub mod order_port;
pub mod telemetry_port;
